//! Settings and MCP file writers
//!
//! Each writer owns exactly one key of its file (`enabledPlugins` or
//! `mcpServers`); every other key is read back and written unchanged.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use claudeup_live::paths::McpLocation;
use claudeup_live::McpServer;

use crate::diff::generate_text_diff;
use crate::error::CoreResult;
use crate::util::{read_json_object_or_empty, write_json_atomic};

const ENABLED_PLUGINS: &str = "enabledPlugins";
const MCP_SERVERS: &str = "mcpServers";

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    }
}

/// Settings file content with `enabledPlugins` replaced by `entries`
pub fn settings_document(path: &Path, entries: &BTreeMap<String, bool>) -> CoreResult<Value> {
    let mut root = read_json_object_or_empty(path)?;
    root.insert(ENABLED_PLUGINS.to_string(), serde_json::to_value(entries)?);
    Ok(Value::Object(root))
}

/// MCP file content with servers upserted and removed by name
pub fn mcp_document(
    location: &McpLocation,
    upsert: &[McpServer],
    remove: &[String],
) -> CoreResult<Value> {
    let mut root = read_json_object_or_empty(&location.path)?;

    let edit = |container: &mut Map<String, Value>| -> CoreResult<()> {
        let mut servers = take_object(container, MCP_SERVERS);
        for server in upsert {
            servers.insert(server.name.clone(), serde_json::to_value(&server.spec)?);
        }
        for name in remove {
            servers.remove(name);
        }
        container.insert(MCP_SERVERS.to_string(), Value::Object(servers));
        Ok(())
    };

    match &location.project_key {
        None => edit(&mut root)?,
        Some(key) => {
            let mut projects = take_object(&mut root, "projects");
            let mut project = take_object(&mut projects, key);
            edit(&mut project)?;
            projects.insert(key.clone(), Value::Object(project));
            root.insert("projects".to_string(), Value::Object(projects));
        }
    }
    Ok(Value::Object(root))
}

/// Remove one `enabledPlugins` entry; returns false if it was absent
pub fn remove_enabled_plugin(path: &Path, key: &str) -> CoreResult<bool> {
    let mut root = read_json_object_or_empty(path)?;
    let mut plugins = take_object(&mut root, ENABLED_PLUGINS);
    let removed = plugins.remove(key).is_some();
    root.insert(ENABLED_PLUGINS.to_string(), Value::Object(plugins));
    if removed {
        write_json_atomic(path, &root)?;
        tracing::info!("Removed {key} from {}", path.display());
    }
    Ok(removed)
}

/// Line diff between a file's current content and `document`
pub fn preview(path: &Path, document: &Value) -> CoreResult<String> {
    let old = fs::read_to_string(path).unwrap_or_default();
    let mut new = serde_json::to_string_pretty(document)?;
    new.push('\n');
    Ok(generate_text_diff(&old, &new))
}
