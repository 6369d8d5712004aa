//! Drift detection against the project pointer
//!
//! The committed `.claudeup.json` says which plugins the project expects
//! at project scope: either its legacy flat `plugins` list or, when that
//! is absent, the project scope of the profile it names. Drift is any
//! disagreement with the live project settings.

use std::fmt;
use std::path::{Path, PathBuf};

use claudeup_live::{ClaudePaths, LiveState, PluginKey, Scope};

use crate::apply::write::remove_enabled_plugin;
use crate::config::Config;
use crate::diff::{
    annotate_also_in_profile, diff, Annotation, ChangeKind, ConfigSnapshot, DiffOptions, Field,
};
use crate::error::{CoreError, CoreResult};
use crate::pointer::ProjectPointer;
use crate::profile::{
    PluginSet, Profile, ProfileKind, ProfileLocation, ProfileStore, ScopeSettings,
};
use crate::resolve::{at_scope, load_composed};

/// Scope the project pointer describes
const POINTER_SCOPE: Scope = Scope::Project;

/// How an entry drifted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// Declared by the pointer but not enabled live
    Missing,
    /// Enabled live but not declared by the pointer
    Untracked,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Untracked => write!(f, "untracked"),
        }
    }
}

/// One orphaned config entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftEntry {
    pub scope: Scope,
    pub key: PluginKey,
    pub kind: DriftKind,
    /// The saved profile declares this key at the same scope
    pub also_in_profile: bool,
}

impl fmt::Display for DriftEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} scope)", self.kind, self.key, self.scope)?;
        if self.also_in_profile {
            write!(f, " {}", Annotation::AlsoInProfile)?;
        }
        Ok(())
    }
}

/// Where the declared plugin list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredSource {
    /// The pointer's legacy `plugins` field
    PointerList,
    /// The named profile's project scope
    Profile,
    /// Neither was available
    Nothing,
}

/// Result of a drift check
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub pointer: ProjectPointer,
    pub declared_from: DeclaredSource,
    pub entries: Vec<DriftEntry>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Entry for a plugin key
    pub fn entry(&self, key: &PluginKey) -> Option<&DriftEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }
}

/// What a cleanup touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOutcome {
    /// Removed from the live settings file
    pub live: bool,
    /// Removed from the pointer's legacy list
    pub pointer: bool,
    /// Removed from the saved profile
    pub profile: bool,
}

/// Compares the project pointer against live settings
#[derive(Debug, Clone)]
pub struct DriftDetector {
    claude: ClaudePaths,
    project_dir: PathBuf,
    store: ProfileStore,
}

impl DriftDetector {
    #[must_use]
    pub fn new(config: &Config, project_dir: &Path) -> Self {
        Self {
            claude: config.claude.clone(),
            project_dir: project_dir.to_path_buf(),
            store: ProfileStore::from_config(config, project_dir),
        }
    }

    fn locate_saved(&self, pointer: &ProjectPointer) -> CoreResult<ProfileLocation> {
        self.store.locate_with(&pointer.profile, |candidates| {
            candidates
                .iter()
                .position(|c| Some(c.source) == pointer.profile_source)
        })
    }

    fn saved_profile(&self, pointer: &ProjectPointer) -> Option<Profile> {
        let loaded = self.locate_saved(pointer).and_then(|location| {
            load_composed(&self.store, &location.reference, |candidates| {
                candidates.iter().position(|c| c.path == location.path)
            })
        });
        match loaded {
            Ok((_, profile)) => Some(at_scope(&profile, POINTER_SCOPE)),
            Err(e) => {
                tracing::warn!("Cannot cross-check saved profile '{}': {e}", pointer.profile);
                None
            }
        }
    }

    /// Find orphaned entries between pointer and live settings
    pub fn detect(&self) -> CoreResult<DriftReport> {
        let pointer = ProjectPointer::require(&self.project_dir)?;
        let saved = self.saved_profile(&pointer);

        let (declared, declared_from) = match (&pointer.plugins, &saved) {
            (Some(list), _) => (
                list.iter().cloned().collect::<PluginSet>(),
                DeclaredSource::PointerList,
            ),
            (None, Some(profile)) => (
                profile.scope(POINTER_SCOPE).plugins,
                DeclaredSource::Profile,
            ),
            (None, None) => (PluginSet::new(), DeclaredSource::Nothing),
        };

        let live = LiveState::load(&self.claude, &self.project_dir);
        let mut before = ConfigSnapshot::default();
        before.scopes.insert(
            POINTER_SCOPE,
            ScopeSettings {
                plugins: declared,
                mcp_servers: Vec::new(),
            },
        );
        let mut after = ConfigSnapshot::default();
        after.scopes.insert(
            POINTER_SCOPE,
            ScopeSettings {
                plugins: live.enabled(POINTER_SCOPE).into_iter().collect(),
                mcp_servers: Vec::new(),
            },
        );
        before.normalize();
        after.normalize();

        let mut result = diff(&before, &after, DiffOptions::default());
        if let Some(profile) = &saved {
            annotate_also_in_profile(&mut result, profile);
        }

        let mut entries = Vec::new();
        for change in result.for_field(Field::Plugins) {
            let Some(scope) = change.scope else { continue };
            let kind = match change.kind {
                ChangeKind::Removed => DriftKind::Missing,
                ChangeKind::Added => DriftKind::Untracked,
                ChangeKind::Modified => continue,
            };
            entries.push(DriftEntry {
                scope,
                key: change.key.parse()?,
                kind,
                also_in_profile: change.has(Annotation::AlsoInProfile),
            });
        }

        Ok(DriftReport {
            pointer,
            declared_from,
            entries,
        })
    }

    /// Clean up exactly one `(scope, key)` entry
    ///
    /// Untracked entries are removed from the live settings file; missing
    /// entries are removed from the pointer's legacy list. With
    /// `also_profile`, an entry annotated as also in the saved profile is
    /// removed from that profile's document too.
    pub fn clean(&self, entry: &DriftEntry, also_profile: bool) -> CoreResult<CleanOutcome> {
        let mut outcome = CleanOutcome::default();
        let mut pointer = ProjectPointer::require(&self.project_dir)?;

        match entry.kind {
            DriftKind::Untracked => {
                let path = self.claude.settings_path(entry.scope, &self.project_dir);
                outcome.live = remove_enabled_plugin(&path, &entry.key.to_string())?;
            }
            DriftKind::Missing => {
                if let Some(list) = pointer.plugins.as_mut() {
                    let before = list.len();
                    list.retain(|k| k != &entry.key);
                    if list.len() != before {
                        pointer.write(&self.project_dir)?;
                        outcome.pointer = true;
                    }
                }
            }
        }

        if also_profile && entry.also_in_profile {
            outcome.profile = self.remove_from_profile(&pointer, entry)?;
        }
        Ok(outcome)
    }

    fn remove_from_profile(&self, pointer: &ProjectPointer, entry: &DriftEntry) -> CoreResult<bool> {
        let location = self.locate_saved(pointer)?;
        let mut profile = self.store.load_at(&location)?;
        let scope = match profile.kind {
            ProfileKind::LegacyFlat => Scope::User,
            ProfileKind::PerScope | ProfileKind::Stack => entry.scope,
        };

        let removed = profile
            .scopes
            .get_mut(&scope)
            .is_some_and(|settings| settings.plugins.remove(&entry.key));
        if !removed {
            return Err(CoreError::NotFound {
                kind: "Plugin",
                name: format!("{} in {}", entry.key, location),
            });
        }
        profile.scopes.retain(|_, s| !s.is_empty());
        self.store.save(&profile, location.source)?;
        tracing::info!("Removed {} from profile '{}'", entry.key, location.reference);
        Ok(true)
    }
}
