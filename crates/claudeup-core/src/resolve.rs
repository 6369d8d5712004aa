//! Scope resolution
//!
//! Answers two questions: which settings a profile declares for the scopes
//! being applied, and which profile is currently active in a directory.
//! Scopes never override each other's content; precedence (local, then
//! project, then user) only matters for "which profile is active here".

use std::collections::BTreeMap;
use std::path::Path;

use claudeup_live::{LiveState, PluginKey, Scope};

use crate::breadcrumb::{Breadcrumb, BreadcrumbStore};
use crate::error::{CoreError, CoreResult};
use crate::profile::{
    compose, Profile, ProfileKind, ProfileLocation, ProfileStore, ScopeSettings,
};

/// Reference that resolves to the active profile
pub const CURRENT: &str = "current";

/// Settings a profile declares for each targeted scope
///
/// - legacy flat profiles target `requested` (default user);
/// - per-scope profiles target their declared scopes, or only `requested`
///   when given (which must then be declared);
/// - stacks target their composed scopes and reject `requested`.
pub fn target_scopes(
    profile: &Profile,
    requested: Option<Scope>,
) -> CoreResult<BTreeMap<Scope, ScopeSettings>> {
    match profile.kind {
        ProfileKind::Stack if requested.is_some() => {
            Err(CoreError::StackWithScope(profile.name.clone()))
        }
        ProfileKind::LegacyFlat => {
            let scope = requested.unwrap_or(Scope::User);
            Ok(BTreeMap::from([(scope, profile.scope(Scope::User))]))
        }
        ProfileKind::PerScope | ProfileKind::Stack => match requested {
            None => Ok(profile
                .scopes
                .iter()
                .filter(|(_, s)| !s.is_empty())
                .map(|(scope, s)| (*scope, s.clone()))
                .collect()),
            Some(scope) => match profile.scopes.get(&scope) {
                Some(settings) if !settings.is_empty() => {
                    Ok(BTreeMap::from([(scope, settings.clone())]))
                }
                _ => Err(CoreError::NotFound {
                    kind: "Scope settings",
                    name: format!("{} ({scope} scope)", profile.name),
                }),
            },
        },
    }
}

/// Effective declared settings for a set of scopes
///
/// Undeclared scopes are present and empty.
#[must_use]
pub fn effective_declared(profile: &Profile, scopes: &[Scope]) -> BTreeMap<Scope, ScopeSettings> {
    scopes
        .iter()
        .map(|scope| {
            let settings = match profile.kind {
                ProfileKind::LegacyFlat if *scope != Scope::User => ScopeSettings::default(),
                _ => profile.scope(*scope),
            };
            (*scope, settings)
        })
        .collect()
}

/// A profile as it would be declared at one scope
///
/// Legacy flat profiles have their user-scope content moved to `scope`;
/// other profiles keep only what they declare there.
#[must_use]
pub fn at_scope(profile: &Profile, scope: Scope) -> Profile {
    let settings = match profile.kind {
        ProfileKind::LegacyFlat => profile.scope(Scope::User),
        _ => profile.scope(scope),
    };
    let mut projected = profile.clone();
    projected.scopes = BTreeMap::from([(scope, settings)]);
    projected
}

/// The profile active at some scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProfile {
    /// Scope whose breadcrumb won
    pub scope: Scope,
    /// The breadcrumb itself
    pub breadcrumb: Breadcrumb,
}

/// Find the active profile for a directory
///
/// Without `pin` the most specific scope with a breadcrumb wins (local,
/// then project, then user) and `None` means nothing was ever applied.
/// With `pin` only that scope is consulted and a missing breadcrumb is
/// [`CoreError::NoActiveProfile`].
pub fn current_profile(
    breadcrumbs: &BreadcrumbStore,
    project_dir: &Path,
    pin: Option<Scope>,
) -> CoreResult<Option<ActiveProfile>> {
    if let Some(scope) = pin {
        return breadcrumbs
            .get(scope, project_dir)
            .map(|breadcrumb| Some(ActiveProfile { scope, breadcrumb }))
            .ok_or(CoreError::NoActiveProfile(scope));
    }

    Ok(Scope::by_precedence().into_iter().find_map(|scope| {
        breadcrumbs
            .get(scope, project_dir)
            .map(|breadcrumb| ActiveProfile { scope, breadcrumb })
    }))
}

/// Replace the `current` keyword with the active profile's name
pub fn resolve_reference(
    reference: &str,
    breadcrumbs: &BreadcrumbStore,
    project_dir: &Path,
    pin: Option<Scope>,
) -> CoreResult<String> {
    if !reference.eq_ignore_ascii_case(CURRENT) {
        return Ok(reference.to_string());
    }
    current_profile(breadcrumbs, project_dir, pin)?
        .map(|active| active.breadcrumb.profile)
        .ok_or(CoreError::NoActiveProfile(pin.unwrap_or(Scope::User)))
}

/// Load a profile and flatten its includes
///
/// `choose` picks among ambiguous candidates for the top-level reference;
/// includes must resolve unambiguously.
pub fn load_composed<F>(
    store: &ProfileStore,
    reference: &str,
    choose: F,
) -> CoreResult<(ProfileLocation, Profile)>
where
    F: FnOnce(&[ProfileLocation]) -> Option<usize>,
{
    let location = store.locate_with(reference, choose)?;
    let profile = store.load_at(&location)?;
    let composed = compose(&profile, |include| {
        let location = store.locate(include)?;
        let child = store.load_at(&location)?;
        Ok((location.reference, child))
    })?;
    tracing::debug!(
        "Loaded '{}' from {} ({} scope(s))",
        composed.name,
        location.source,
        composed.declared_scopes().len()
    );
    Ok((location, composed))
}

/// A plugin visible in the effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePlugin {
    pub key: PluginKey,
    /// Scopes that enable it, in presentation order
    pub scopes: Vec<Scope>,
}

/// One plugin as listed in a scope section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPlugin {
    pub key: PluginKey,
    /// Whether an install record exists for this scope and project
    /// (`None` for declared-only configurations)
    pub installed: Option<bool>,
}

/// Deduplicated, scope-annotated union of plugins and MCP servers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Every distinct plugin key, sorted
    pub plugins: Vec<EffectivePlugin>,
    /// Per-scope sections; a key enabled in two scopes appears in both
    pub sections: BTreeMap<Scope, Vec<ScopedPlugin>>,
    /// MCP server names per scope
    pub mcp_servers: BTreeMap<Scope, Vec<String>>,
}

impl EffectiveConfig {
    /// Effective configuration from live state
    #[must_use]
    pub fn from_live(live: &LiveState, scopes: &[Scope]) -> Self {
        let mut config = Self::default();
        for scope in sorted(scopes) {
            let mut section: Vec<ScopedPlugin> = live
                .enabled(scope)
                .into_iter()
                .map(|key| ScopedPlugin {
                    installed: Some(live.is_installed(&key, scope)),
                    key,
                })
                .collect();
            section.sort_by(|a, b| a.key.cmp(&b.key));
            config.add_section(scope, section);
            config.mcp_servers.insert(
                scope,
                live.servers(scope).iter().map(|s| s.name.clone()).collect(),
            );
        }
        config.finish();
        config
    }

    /// Effective configuration a profile declares
    #[must_use]
    pub fn from_profile(profile: &Profile, scopes: &[Scope]) -> Self {
        let mut config = Self::default();
        for (scope, settings) in effective_declared(profile, &sorted(scopes)) {
            let section = settings
                .plugins
                .sorted()
                .into_iter()
                .map(|key| ScopedPlugin {
                    key,
                    installed: None,
                })
                .collect();
            config.add_section(scope, section);
            let mut names: Vec<String> =
                settings.mcp_servers.iter().map(|s| s.name.clone()).collect();
            names.sort();
            config.mcp_servers.insert(scope, names);
        }
        config.finish();
        config
    }

    fn add_section(&mut self, scope: Scope, section: Vec<ScopedPlugin>) {
        for entry in &section {
            match self.plugins.iter_mut().find(|p| p.key == entry.key) {
                Some(existing) => existing.scopes.push(scope),
                None => self.plugins.push(EffectivePlugin {
                    key: entry.key.clone(),
                    scopes: vec![scope],
                }),
            }
        }
        self.sections.insert(scope, section);
    }

    fn finish(&mut self) {
        self.plugins.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Distinct plugin keys across all scopes
    pub fn unique_count(&self) -> usize {
        self.plugins.len()
    }

    /// Plugins at one scope
    pub fn section(&self, scope: Scope) -> &[ScopedPlugin] {
        self.sections.get(&scope).map_or(&[], Vec::as_slice)
    }

    /// Scope-enabled plugins with no install record for this project
    pub fn not_installed(&self) -> Vec<(Scope, &PluginKey)> {
        self.sections
            .iter()
            .flat_map(|(scope, section)| {
                section
                    .iter()
                    .filter(|p| p.installed == Some(false))
                    .map(move |p| (*scope, &p.key))
            })
            .collect()
    }
}

fn sorted(scopes: &[Scope]) -> Vec<Scope> {
    let mut scopes = scopes.to_vec();
    scopes.sort();
    scopes.dedup();
    scopes
}
