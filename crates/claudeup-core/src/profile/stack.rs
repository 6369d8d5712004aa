//! Stack composition
//!
//! A stack profile's content comes from the profiles it `includes`. The
//! include graph is walked depth-first; every profile is merged exactly
//! once (diamonds are fine) and re-entering a profile that is still being
//! expanded is a cycle. Any error aborts the whole composition: there is
//! no partially merged result.

use std::collections::{HashMap, HashSet};

use claudeup_live::Scope;

use crate::error::{CoreError, CoreResult};

use super::types::{Extensions, Marketplace, Profile, ScopeSettings};

/// Flatten a profile's include graph into a single profile
///
/// `resolve` maps an include reference to `(identity, profile)` where
/// `identity` is stable across spellings of the same profile (for
/// example the store path). The result keeps the root's name, kind,
/// description and post-apply hook, and has `includes` cleared.
///
/// Merge rules: marketplaces and per-scope plugin sets are unioned,
/// extensions are concatenated without duplicates, MCP servers are
/// unioned by name. Two profiles defining the same server name in the
/// same scope differently is a [`CoreError::ConflictingMcpServer`].
pub fn compose<F>(root: &Profile, resolve: F) -> CoreResult<Profile>
where
    F: FnMut(&str) -> CoreResult<(String, Profile)>,
{
    if root.includes.is_empty() {
        return Ok(root.clone());
    }

    let mut composer = Composer {
        resolve,
        visiting: Vec::new(),
        done: HashSet::new(),
        merged: Merged::default(),
    };
    composer.visit(root.name.clone(), root)?;

    let Merged {
        marketplaces,
        extensions,
        scopes,
        ..
    } = composer.merged;

    Ok(Profile {
        name: root.name.clone(),
        description: root.description.clone(),
        marketplaces,
        includes: Vec::new(),
        extensions,
        post_apply: root.post_apply.clone(),
        scopes: scopes
            .into_iter()
            .filter(|(_, s)| !s.is_empty())
            .collect(),
        kind: root.kind,
    })
}

#[derive(Default)]
struct Merged {
    marketplaces: Vec<Marketplace>,
    extensions: Extensions,
    scopes: std::collections::BTreeMap<Scope, ScopeSettings>,
    server_origin: HashMap<(Scope, String), String>,
}

struct Composer<F> {
    resolve: F,
    visiting: Vec<String>,
    done: HashSet<String>,
    merged: Merged,
}

impl<F> Composer<F>
where
    F: FnMut(&str) -> CoreResult<(String, Profile)>,
{
    fn visit(&mut self, identity: String, profile: &Profile) -> CoreResult<()> {
        if let Some(pos) = self.visiting.iter().position(|id| *id == identity) {
            let mut chain = self.visiting[pos..].to_vec();
            chain.push(identity);
            return Err(CoreError::CyclicInclude { chain });
        }
        if self.done.contains(&identity) {
            return Ok(());
        }

        self.visiting.push(identity.clone());
        for include in &profile.includes {
            let (child_id, child) = (self.resolve)(include)?;
            self.visit(child_id, &child)?;
        }
        self.merge(&identity, profile)?;
        self.visiting.pop();
        self.done.insert(identity);
        Ok(())
    }

    fn merge(&mut self, identity: &str, profile: &Profile) -> CoreResult<()> {
        let merged = &mut self.merged;

        for marketplace in &profile.marketplaces {
            if !merged.marketplaces.contains(marketplace) {
                merged.marketplaces.push(marketplace.clone());
            }
        }
        merged.extensions.merge(&profile.extensions);

        for (scope, settings) in &profile.scopes {
            let target = merged.scopes.entry(*scope).or_default();
            target.plugins.union_with(&settings.plugins);

            for server in &settings.mcp_servers {
                let origin_key = (*scope, server.name.clone());
                match target.server(&server.name) {
                    Some(existing) if existing != server => {
                        let first = merged
                            .server_origin
                            .get(&origin_key)
                            .cloned()
                            .unwrap_or_default();
                        return Err(CoreError::ConflictingMcpServer {
                            server: server.name.clone(),
                            scope: *scope,
                            first,
                            second: identity.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        target.mcp_servers.push(server.clone());
                        merged
                            .server_origin
                            .insert(origin_key, identity.to_string());
                    }
                }
            }
        }
        Ok(())
    }
}
