//! Profile snapshots from live state

use claudeup_live::registry::MarketplaceSource;
use claudeup_live::{LiveState, Scope};

use super::types::{Marketplace, Profile, ProfileKind};

/// Marketplace reference for a known marketplace
#[must_use]
pub fn marketplace_ref(source: &MarketplaceSource) -> Marketplace {
    Marketplace {
        source: source.kind().to_string(),
        repo: source.location().to_string(),
    }
}

/// Capture the current live configuration as a per-scope profile
///
/// Used by `profile save` and to bootstrap a missing profile before an
/// apply.
#[must_use]
pub fn snapshot_live(name: &str, live: &LiveState) -> Profile {
    let mut profile = Profile::new(name);
    profile.kind = ProfileKind::PerScope;

    for known in live.marketplaces.entries.values() {
        profile.add_marketplace(marketplace_ref(&known.source));
    }

    for scope in Scope::ALL {
        for key in live.enabled(scope) {
            profile.add_plugin(scope, key);
        }
        for server in live.servers(scope) {
            profile.scope_mut(scope).upsert_server(server.clone());
        }
    }
    profile.scopes.retain(|_, s| !s.is_empty());
    profile
}
