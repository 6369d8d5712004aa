//! On-disk profile documents
//!
//! Three document shapes coexist in the wild. They are told apart once,
//! here, and converted to the canonical [`Profile`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use claudeup_live::{McpServer, PluginKey, Scope};

use super::types::{
    Extensions, Marketplace, PluginSet, PostApplyHook, Profile, ProfileKind, ScopeSettings,
};

/// Raw profile document as stored in a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marketplaces: Vec<Marketplace>,
    /// Legacy flat plugin list (user scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginKey>>,
    /// Legacy flat MCP server list (user scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Vec<McpServer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_scope: Option<BTreeMap<Scope, ScopeSettings>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_apply: Option<PostApplyHook>,
}

/// The declared shape of a document
#[derive(Debug)]
pub enum ProfileShape {
    /// `includes` present: composed from other profiles
    Stack {
        includes: Vec<String>,
        own: BTreeMap<Scope, ScopeSettings>,
    },
    /// Explicit per-scope settings
    PerScope(BTreeMap<Scope, ScopeSettings>),
    /// Flat plugin list, implicitly user scope
    LegacyFlat(ScopeSettings),
}

impl ProfileDocument {
    /// Classify the document, folding legacy fields into user scope
    pub fn shape(&mut self) -> ProfileShape {
        let legacy = ScopeSettings {
            plugins: self
                .plugins
                .take()
                .unwrap_or_default()
                .into_iter()
                .collect::<PluginSet>(),
            mcp_servers: self.mcp_servers.take().unwrap_or_default(),
        };
        let per_scope = self.per_scope.take();

        let mut scopes = per_scope.clone().unwrap_or_default();
        if !legacy.is_empty() {
            if per_scope.is_some() {
                tracing::warn!(
                    "Profile '{}' has both 'plugins' and 'perScope'; merging the flat list into user scope",
                    self.name
                );
            }
            let user = scopes.entry(Scope::User).or_default();
            user.plugins.union_with(&legacy.plugins);
            for server in &legacy.mcp_servers {
                user.upsert_server(server.clone());
            }
        }

        if !self.includes.is_empty() {
            ProfileShape::Stack {
                includes: std::mem::take(&mut self.includes),
                own: scopes,
            }
        } else if per_scope.is_some() {
            ProfileShape::PerScope(scopes)
        } else {
            ProfileShape::LegacyFlat(scopes.remove(&Scope::User).unwrap_or_default())
        }
    }

    /// Convert into the canonical profile
    ///
    /// `reference` (the store path) wins over the `name` field.
    pub fn into_profile(mut self, reference: &str) -> Profile {
        let (kind, includes, mut scopes) = match self.shape() {
            ProfileShape::Stack { includes, own } => (ProfileKind::Stack, includes, own),
            ProfileShape::PerScope(scopes) => (ProfileKind::PerScope, Vec::new(), scopes),
            ProfileShape::LegacyFlat(user) => {
                let mut scopes = BTreeMap::new();
                scopes.insert(Scope::User, user);
                (ProfileKind::LegacyFlat, Vec::new(), scopes)
            }
        };
        scopes.retain(|_, s| !s.is_empty());

        let mut marketplaces: Vec<Marketplace> = Vec::new();
        for m in self.marketplaces {
            if !marketplaces.contains(&m) {
                marketplaces.push(m);
            }
        }

        Profile {
            name: reference.to_string(),
            description: self.description.filter(|d| !d.is_empty()),
            marketplaces,
            includes,
            extensions: self.extensions,
            post_apply: self.post_apply,
            scopes,
            kind,
        }
    }

    /// Canonical document for a profile; always written in per-scope form
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        let scopes: BTreeMap<Scope, ScopeSettings> = profile
            .scopes
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(scope, s)| (*scope, s.clone()))
            .collect();
        let per_scope = if scopes.is_empty() && !profile.includes.is_empty() {
            None
        } else {
            Some(scopes)
        };

        Self {
            name: profile.name.clone(),
            description: profile.description.clone(),
            marketplaces: profile.marketplaces.clone(),
            plugins: None,
            mcp_servers: None,
            per_scope,
            includes: profile.includes.clone(),
            extensions: profile.extensions.clone(),
            post_apply: profile.post_apply.clone(),
        }
    }
}
