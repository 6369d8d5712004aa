//! Diff algorithm
//!
//! Collections are compared as sets keyed by natural identity: plugin key,
//! marketplace repo, MCP server name, extension file reference. Scalar
//! fields are compared by value.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use claudeup_live::{LiveState, McpServer, McpServerSpec, PluginKey, Scope};

use crate::error::CoreResult;
use crate::profile::{Extensions, Marketplace, PostApplyHook, Profile, ScopeSettings};
use crate::resolve::at_scope;

use super::snapshot::ConfigSnapshot;
use super::types::{Annotation, Change, ChangeKind, DiffResult, Field};

/// Diff behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Expand modified struct values into per-subfield changes
    pub full: bool,
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn keyed(
    field: Field,
    scope: Option<Scope>,
    before: &BTreeMap<String, Value>,
    after: &BTreeMap<String, Value>,
    out: &mut Vec<Change>,
) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        out.extend(Change::new(
            field,
            scope,
            key.as_str(),
            before.get(key).cloned(),
            after.get(key).cloned(),
        ));
    }
}

fn marketplace_map(marketplaces: &[Marketplace]) -> BTreeMap<String, Value> {
    marketplaces
        .iter()
        .map(|m| (m.repo.clone(), to_value(m)))
        .collect()
}

fn plugin_map(settings: &ScopeSettings) -> BTreeMap<String, Value> {
    settings
        .plugins
        .iter()
        .map(|key| (key.to_string(), Value::Bool(true)))
        .collect()
}

fn server_map(settings: &ScopeSettings) -> BTreeMap<String, Value> {
    settings
        .mcp_servers
        .iter()
        .map(|server| (server.name.clone(), to_value(&server.spec)))
        .collect()
}

fn item_map(items: &[String]) -> BTreeMap<String, Value> {
    items
        .iter()
        .map(|item| (item.clone(), Value::String(item.clone())))
        .collect()
}

fn extension_items(extensions: &Extensions, field: Field) -> &[String] {
    match field {
        Field::Agents => &extensions.agents,
        Field::Commands => &extensions.commands,
        _ => &extensions.skills,
    }
}

/// Expand a modified object into one change per differing sub-field
fn expand(change: Change) -> Vec<Change> {
    let expanded: Vec<Change> = match (&change.before, &change.after) {
        (Some(Value::Object(before)), Some(Value::Object(after))) => {
            let subfields: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
            subfields
                .into_iter()
                .filter_map(|sub| {
                    let mut expanded = Change::new(
                        change.field,
                        change.scope,
                        change.key.as_str(),
                        before.get(sub).cloned(),
                        after.get(sub).cloned(),
                    )?;
                    expanded.subfield = Some(sub.clone());
                    Some(expanded)
                })
                .collect()
        }
        _ => Vec::new(),
    };
    if expanded.is_empty() {
        vec![change]
    } else {
        expanded
    }
}

/// Compute the changes that turn `before` into `after`
#[must_use]
pub fn diff(before: &ConfigSnapshot, after: &ConfigSnapshot, options: DiffOptions) -> DiffResult {
    let mut changes = Vec::new();

    changes.extend(Change::new(
        Field::Description,
        None,
        "",
        before.description.as_ref().map(to_value),
        after.description.as_ref().map(to_value),
    ));
    keyed(
        Field::Marketplaces,
        None,
        &marketplace_map(&before.marketplaces),
        &marketplace_map(&after.marketplaces),
        &mut changes,
    );

    for scope in Scope::ALL {
        let (b, a) = (before.scope(scope), after.scope(scope));
        keyed(
            Field::Plugins,
            Some(scope),
            &plugin_map(&b),
            &plugin_map(&a),
            &mut changes,
        );
        keyed(
            Field::McpServers,
            Some(scope),
            &server_map(&b),
            &server_map(&a),
            &mut changes,
        );
    }

    for field in [Field::Agents, Field::Commands, Field::Skills] {
        keyed(
            field,
            None,
            &item_map(extension_items(&before.extensions, field)),
            &item_map(extension_items(&after.extensions, field)),
            &mut changes,
        );
    }

    changes.extend(Change::new(
        Field::PostApply,
        None,
        "",
        before.post_apply.as_ref().map(to_value),
        after.post_apply.as_ref().map(to_value),
    ));

    if options.full {
        changes = changes
            .into_iter()
            .flat_map(|change| match change.kind {
                ChangeKind::Modified => expand(change),
                _ => vec![change],
            })
            .collect();
    }

    DiffResult::from_changes(changes)
}

/// Compare two scopes of one snapshot
///
/// Entries only in `to` are Added (tagged with `to`), entries only in
/// `from` are Removed (tagged with `from`), and servers defined
/// differently are Modified (tagged with `to`).
#[must_use]
pub fn diff_scopes(snapshot: &ConfigSnapshot, from: Scope, to: Scope) -> DiffResult {
    let (source, target) = (snapshot.scope(from), snapshot.scope(to));
    let mut changes = Vec::new();
    keyed(
        Field::Plugins,
        None,
        &plugin_map(&source),
        &plugin_map(&target),
        &mut changes,
    );
    keyed(
        Field::McpServers,
        None,
        &server_map(&source),
        &server_map(&target),
        &mut changes,
    );
    for change in &mut changes {
        change.scope = Some(match change.kind {
            ChangeKind::Removed => from,
            ChangeKind::Added | ChangeKind::Modified => to,
        });
    }
    DiffResult::from_changes(changes)
}

/// Compare a saved profile with live configuration
///
/// With `scope`, only that scope is compared and a legacy flat profile is
/// read as declaring it. Otherwise all scopes are compared, so live
/// entries at scopes the profile leaves alone show up as Added.
#[must_use]
pub fn diff_profile_live(
    profile: &Profile,
    live: &LiveState,
    scope: Option<Scope>,
    options: DiffOptions,
) -> DiffResult {
    let (projected, scopes) = match scope {
        Some(scope) => (at_scope(profile, scope), vec![scope]),
        None => (profile.clone(), Scope::ALL.to_vec()),
    };
    let declared = ConfigSnapshot::from_profile(&projected).restrict(&scopes);
    let current = ConfigSnapshot::from_live_for(live, &declared, &scopes);
    diff(&declared, &current, options)
}

/// Tag changes whose key is also declared in `saved`
///
/// Per-scope changes only match the same scope of the saved profile.
/// Returns the number of changes tagged.
pub fn annotate_also_in_profile(result: &mut DiffResult, saved: &Profile) -> usize {
    let mut tagged = 0;
    for change in &mut result.changes {
        let declared = match (change.field, change.scope) {
            (Field::Plugins, Some(scope)) => change
                .key
                .parse::<PluginKey>()
                .is_ok_and(|key| saved.scope(scope).plugins.contains(&key)),
            (Field::McpServers, Some(scope)) => saved.scope(scope).server(&change.key).is_some(),
            (Field::Marketplaces, _) => saved.marketplaces.iter().any(|m| m.repo == change.key),
            (Field::Agents | Field::Commands | Field::Skills, _) => {
                extension_items(&saved.extensions, change.field).contains(&change.key)
            }
            _ => false,
        };
        if declared && !change.has(Annotation::AlsoInProfile) {
            change.annotations.push(Annotation::AlsoInProfile);
            tagged += 1;
        }
    }
    tagged
}

fn patched(current: Option<Value>, change: &Change) -> Option<Value> {
    match &change.subfield {
        None => change.after.clone(),
        Some(sub) => {
            let mut object = match current {
                Some(Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            match &change.after {
                Some(value) => {
                    object.insert(sub.clone(), value.clone());
                }
                None => {
                    object.remove(sub);
                }
            }
            Some(Value::Object(object))
        }
    }
}

fn patch_items(items: &mut Vec<String>, change: &Change) {
    items.retain(|item| *item != change.key);
    if change.after.is_some() {
        items.push(change.key.clone());
    }
}

/// Apply a diff to a snapshot
///
/// `patch(x, &diff(x, y, _))` yields a snapshot with no differences from
/// `y`.
pub fn patch(snapshot: &ConfigSnapshot, result: &DiffResult) -> CoreResult<ConfigSnapshot> {
    let mut out = snapshot.clone();

    for change in result {
        match change.field {
            Field::Description => {
                let current = out.description.as_ref().map(to_value);
                out.description = patched(current, change)
                    .map(serde_json::from_value)
                    .transpose()?;
            }
            Field::PostApply => {
                let current = out.post_apply.as_ref().map(to_value);
                out.post_apply = patched(current, change)
                    .map(serde_json::from_value::<PostApplyHook>)
                    .transpose()?;
            }
            Field::Marketplaces => {
                let position = out.marketplaces.iter().position(|m| m.repo == change.key);
                let current = position.map(|i| to_value(&out.marketplaces[i]));
                let next = patched(current, change)
                    .map(serde_json::from_value::<Marketplace>)
                    .transpose()?;
                match (position, next) {
                    (Some(i), Some(m)) => out.marketplaces[i] = m,
                    (Some(i), None) => {
                        out.marketplaces.remove(i);
                    }
                    (None, Some(m)) => out.marketplaces.push(m),
                    (None, None) => {}
                }
            }
            Field::Plugins => {
                let Some(scope) = change.scope else { continue };
                let key: PluginKey = change.key.parse()?;
                let settings = out.scopes.entry(scope).or_default();
                if change.after.is_some() {
                    settings.plugins.insert(key);
                } else {
                    settings.plugins.remove(&key);
                }
            }
            Field::McpServers => {
                let Some(scope) = change.scope else { continue };
                let settings = out.scopes.entry(scope).or_default();
                let current = settings.server(&change.key).map(|s| to_value(&s.spec));
                match patched(current, change) {
                    Some(value) => settings.upsert_server(McpServer {
                        name: change.key.clone(),
                        spec: serde_json::from_value::<McpServerSpec>(value)?,
                    }),
                    None => settings.mcp_servers.retain(|s| s.name != change.key),
                }
            }
            Field::Agents => patch_items(&mut out.extensions.agents, change),
            Field::Commands => patch_items(&mut out.extensions.commands, change),
            Field::Skills => patch_items(&mut out.extensions.skills, change),
        }
    }

    out.normalize();
    Ok(out)
}
