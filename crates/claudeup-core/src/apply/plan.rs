//! Action plans
//!
//! A plan is built from a fresh read of live state and lists exactly the
//! work needed to converge it. Executing the same profile twice in a row
//! yields an empty second plan.

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::path::PathBuf;

use claudeup_live::paths::McpLocation;
use claudeup_live::{McpServer, PluginKey, Scope};

use crate::diff::DiffResult;
use crate::profile::{HookCondition, Marketplace, ProfileSource};

/// One step of an apply
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Register a marketplace Claude Code does not know yet
    AddMarketplace { marketplace: Marketplace },
    /// Install a plugin at a scope
    InstallPlugin { key: PluginKey, scope: Scope },
    /// Rewrite a scope's `enabledPlugins`
    WriteSettings {
        scope: Scope,
        path: PathBuf,
        /// Entries before the write
        previous: BTreeMap<String, bool>,
        /// Entries after the write (before install failures are removed)
        entries: BTreeMap<String, bool>,
        /// Preview of the file change
        preview: String,
    },
    /// Upsert and remove MCP servers at a scope
    WriteMcpServers {
        scope: Scope,
        location: McpLocation,
        upsert: Vec<McpServer>,
        remove: Vec<String>,
    },
    /// Record the profile as applied at a scope
    WriteBreadcrumb { scope: Scope, profile: String },
    /// Point the project's `.claudeup.json` at the profile
    WritePointer {
        profile: String,
        source: ProfileSource,
    },
    /// Run the post-apply hook
    RunHook {
        command: String,
        condition: HookCondition,
    },
}

impl Action {
    /// Whether executing this action changes files or installs
    pub fn changes_state(&self) -> bool {
        !matches!(self, Self::RunHook { .. })
    }
}

fn keys_where<F>(map: &BTreeMap<String, bool>, pred: F) -> Vec<&str>
where
    F: Fn(&str, bool) -> bool,
{
    map.iter()
        .filter(|(k, v)| pred(k, **v))
        .map(|(k, _)| k.as_str())
        .collect()
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddMarketplace { marketplace } => write!(f, "add marketplace {marketplace}"),
            Self::InstallPlugin { key, scope } => write!(f, "install {key} ({scope} scope)"),
            Self::WriteSettings {
                scope,
                previous,
                entries,
                ..
            } => {
                let enable = keys_where(entries, |k, v| v && previous.get(k) != Some(&true));
                let disable = keys_where(previous, |k, v| v && entries.get(k) != Some(&true));
                write!(f, "write {scope} settings")?;
                if !enable.is_empty() {
                    write!(f, ", enable {}", enable.join(", "))?;
                }
                if !disable.is_empty() {
                    write!(f, ", remove {}", disable.join(", "))?;
                }
                Ok(())
            }
            Self::WriteMcpServers {
                scope,
                upsert,
                remove,
                ..
            } => {
                write!(f, "write {scope} MCP servers")?;
                if !upsert.is_empty() {
                    let names: Vec<&str> = upsert.iter().map(|s| s.name.as_str()).collect();
                    write!(f, ", set {}", names.join(", "))?;
                }
                if !remove.is_empty() {
                    write!(f, ", remove {}", remove.join(", "))?;
                }
                Ok(())
            }
            Self::WriteBreadcrumb { scope, profile } => {
                write!(f, "record '{profile}' as {scope} profile")
            }
            Self::WritePointer { profile, source } => {
                write!(f, "point .claudeup.json at '{profile}' ({source})")
            }
            Self::RunHook { command, condition } => match condition {
                HookCondition::Always => write!(f, "run hook: {command}"),
                HookCondition::OnChange => write!(f, "run hook if changed: {command}"),
            },
        }
    }
}

/// Ordered actions for one apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPlan {
    /// Profile being applied
    pub profile: String,
    /// Declared vs live differences the plan was built from
    pub diff: DiffResult,
    pub actions: Vec<Action>,
}

impl ActionPlan {
    /// True when nothing would be written or installed
    ///
    /// A post-apply hook on its own does not make a plan non-empty.
    pub fn is_empty(&self) -> bool {
        !self.actions.iter().any(Action::changes_state)
    }

    pub fn installs(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| {
            matches!(
                a,
                Action::AddMarketplace { .. } | Action::InstallPlugin { .. }
            )
        })
    }

    /// Human-readable list of steps
    pub fn describe(&self) -> String {
        let mut output = String::new();
        if self.is_empty() {
            let _ = writeln!(output, "No changes needed for '{}'", self.profile);
        }
        for (i, action) in self.actions.iter().enumerate() {
            let _ = writeln!(output, "{:>3}. {action}", i + 1);
        }
        output
    }
}
