//! Configuration snapshots

use std::collections::BTreeMap;

use claudeup_live::{LiveState, Scope};

use crate::profile::snapshot::marketplace_ref;
use crate::profile::{Extensions, Marketplace, PostApplyHook, Profile, ScopeSettings};

/// Everything the diff engine compares
///
/// Empty scopes are never stored, so a snapshot without project content
/// equals one with an empty project section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub description: Option<String>,
    pub marketplaces: Vec<Marketplace>,
    pub scopes: BTreeMap<Scope, ScopeSettings>,
    pub extensions: Extensions,
    pub post_apply: Option<PostApplyHook>,
}

impl ConfigSnapshot {
    /// Declared configuration of a (composed) profile
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        let mut snapshot = Self {
            description: profile.description.clone(),
            marketplaces: profile.marketplaces.clone(),
            scopes: profile.scopes.clone(),
            extensions: profile.extensions.clone(),
            post_apply: profile.post_apply.clone(),
        };
        snapshot.normalize();
        snapshot
    }

    /// Live configuration: enabled plugins, MCP servers, known marketplaces
    #[must_use]
    pub fn from_live(live: &LiveState) -> Self {
        let mut snapshot = Self {
            marketplaces: live
                .marketplaces
                .entries
                .values()
                .map(|known| marketplace_ref(&known.source))
                .collect(),
            ..Self::default()
        };
        for scope in Scope::ALL {
            let settings = snapshot.scopes.entry(scope).or_default();
            for key in live.enabled(scope) {
                settings.plugins.insert(key);
            }
            for server in live.servers(scope) {
                settings.upsert_server(server.clone());
            }
        }
        snapshot.normalize();
        snapshot
    }

    /// Live configuration in the terms of a declaration
    ///
    /// Only `scopes` are kept, known marketplaces are limited to the
    /// declared ones, and the fields live state cannot express
    /// (description, extensions, post-apply hook) are copied from
    /// `declared`.
    #[must_use]
    pub fn from_live_for(live: &LiveState, declared: &ConfigSnapshot, scopes: &[Scope]) -> Self {
        let mut snapshot = Self::from_live(live).restrict(scopes);
        snapshot.marketplaces = declared
            .marketplaces
            .iter()
            .filter(|m| live.marketplaces.contains_location(&m.repo))
            .cloned()
            .collect();
        snapshot.description = declared.description.clone();
        snapshot.extensions = declared.extensions.clone();
        snapshot.post_apply = declared.post_apply.clone();
        snapshot
    }

    /// Keep only the given scopes
    #[must_use]
    pub fn restrict(mut self, scopes: &[Scope]) -> Self {
        self.scopes.retain(|scope, _| scopes.contains(scope));
        self
    }

    /// Settings at a scope (empty if absent)
    #[must_use]
    pub fn scope(&self, scope: Scope) -> ScopeSettings {
        self.scopes.get(&scope).cloned().unwrap_or_default()
    }

    pub(crate) fn normalize(&mut self) {
        self.scopes.retain(|_, settings| !settings.is_empty());
    }
}

impl From<&Profile> for ConfigSnapshot {
    fn from(profile: &Profile) -> Self {
        Self::from_profile(profile)
    }
}
