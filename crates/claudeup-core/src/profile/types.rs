//! Profile types
//!
//! A [`Profile`] is the canonical in-memory form. Whatever shape the
//! document on disk had (legacy flat list, per-scope map, or stack), it is
//! resolved into this struct once at load time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use claudeup_live::{McpServer, PluginKey, Scope};

/// How a profile was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKind {
    /// Legacy flat `plugins` list (implicitly user scope)
    LegacyFlat,
    /// Explicit `perScope` map
    #[default]
    PerScope,
    /// Composed from other profiles via `includes`
    Stack,
}

/// A marketplace reference; identity is the `(source, repo)` pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Marketplace {
    /// Source kind (github, git, local)
    pub source: String,
    /// Repository (`owner/repo`), URL, or path
    pub repo: String,
}

impl Marketplace {
    #[must_use]
    pub fn github(repo: impl Into<String>) -> Self {
        Self {
            source: "github".to_string(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.repo, self.source)
    }
}

/// A set of plugin keys that keeps insertion order
///
/// Re-inserting an existing key is a no-op. Equality ignores order.
#[derive(Debug, Clone, Default, Eq)]
pub struct PluginSet(Vec<PluginKey>);

impl PluginSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key; returns false if it was already present
    pub fn insert(&mut self, key: PluginKey) -> bool {
        if self.0.contains(&key) {
            return false;
        }
        self.0.push(key);
        true
    }

    /// Remove a key; returns false if it was absent
    pub fn remove(&mut self, key: &PluginKey) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != key);
        self.0.len() != before
    }

    pub fn contains(&self, key: &PluginKey) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PluginKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in alphabetical order
    pub fn sorted(&self) -> Vec<PluginKey> {
        let mut keys = self.0.clone();
        keys.sort();
        keys
    }

    /// Add every key of `other` not already present
    pub fn union_with(&mut self, other: &PluginSet) {
        for key in other.iter() {
            self.insert(key.clone());
        }
    }
}

impl PartialEq for PluginSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|k| other.contains(k))
    }
}

impl FromIterator<PluginKey> for PluginSet {
    fn from_iter<I: IntoIterator<Item = PluginKey>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PluginSet {
    type Item = &'a PluginKey;
    type IntoIter = std::slice::Iter<'a, PluginKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for PluginSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PluginSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<PluginKey>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}

/// What a profile declares for one scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSettings {
    /// Plugins to enable
    #[serde(default)]
    pub plugins: PluginSet,
    /// MCP servers, unique by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServer>,
}

impl ScopeSettings {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.mcp_servers.is_empty()
    }

    /// Insert or replace a server by name
    pub fn upsert_server(&mut self, server: McpServer) {
        match self.mcp_servers.iter_mut().find(|s| s.name == server.name) {
            Some(existing) => *existing = server,
            None => self.mcp_servers.push(server),
        }
    }

    pub fn server(&self, name: &str) -> Option<&McpServer> {
        self.mcp_servers.iter().find(|s| s.name == name)
    }
}

/// Agent, command and skill file references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.commands.is_empty() && self.skills.is_empty()
    }

    /// Concatenate another set of references, skipping duplicates
    pub fn merge(&mut self, other: &Extensions) {
        fn extend_unique(into: &mut Vec<String>, from: &[String]) {
            for item in from {
                if !into.contains(item) {
                    into.push(item.clone());
                }
            }
        }
        extend_unique(&mut self.agents, &other.agents);
        extend_unique(&mut self.commands, &other.commands);
        extend_unique(&mut self.skills, &other.skills);
    }
}

/// When a post-apply hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookCondition {
    /// After every apply
    #[default]
    Always,
    /// Only when the apply changed something
    OnChange,
}

/// Command run after a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostApplyHook {
    /// Shell command
    pub command: String,
    /// When to run it
    #[serde(default)]
    pub condition: HookCondition,
}

impl PostApplyHook {
    /// Whether the hook should run given whether the apply changed state
    #[must_use]
    pub fn should_run(&self, changed: bool) -> bool {
        match self.condition {
            HookCondition::Always => true,
            HookCondition::OnChange => changed,
        }
    }
}

/// A named, declarative description of the desired configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    /// Store reference (`name` or `group/name`)
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Marketplaces (global, not scoped)
    pub marketplaces: Vec<Marketplace>,
    /// Other profiles this one is composed from
    pub includes: Vec<String>,
    /// Extension file references
    pub extensions: Extensions,
    /// Hook run after apply
    pub post_apply: Option<PostApplyHook>,
    /// Declared settings per scope
    pub scopes: BTreeMap<Scope, ScopeSettings>,
    /// Shape the profile was declared in
    pub kind: ProfileKind,
}

impl Profile {
    /// Create an empty per-scope profile
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this profile is composed from other profiles
    #[must_use]
    pub fn is_stack(&self) -> bool {
        self.kind == ProfileKind::Stack
    }

    /// Declared settings for a scope (empty if not declared)
    #[must_use]
    pub fn scope(&self, scope: Scope) -> ScopeSettings {
        self.scopes.get(&scope).cloned().unwrap_or_default()
    }

    /// Mutable settings for a scope, creating them if needed
    pub fn scope_mut(&mut self, scope: Scope) -> &mut ScopeSettings {
        self.scopes.entry(scope).or_default()
    }

    /// Add a plugin at a scope; re-adding is a no-op
    pub fn add_plugin(&mut self, scope: Scope, key: PluginKey) -> bool {
        self.scope_mut(scope).plugins.insert(key)
    }

    /// Add a marketplace unless one with the same identity exists
    pub fn add_marketplace(&mut self, marketplace: Marketplace) {
        if !self.marketplaces.contains(&marketplace) {
            self.marketplaces.push(marketplace);
        }
    }

    /// Scopes with declared content, in presentation order
    pub fn declared_scopes(&self) -> Vec<Scope> {
        self.scopes
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(scope, _)| *scope)
            .collect()
    }

    /// Total plugin count over all scopes (a key in two scopes counts twice)
    pub fn plugin_count(&self) -> usize {
        self.scopes.values().map(|s| s.plugins.len()).sum()
    }
}
