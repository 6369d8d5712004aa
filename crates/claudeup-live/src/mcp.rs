//! MCP server definitions
//!
//! Files store servers as a map keyed by name; profiles store them as a
//! list with an explicit `name`. Both share [`McpServerSpec`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{LiveError, LiveResult};
use crate::paths::McpLocation;

/// Server definition without its name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerSpec {
    /// Transport type (stdio, http, sse)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    /// Command for stdio transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// URL for http/sse transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Every other field (`headers`, `cwd`, `timeout`, ...), kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A named MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    /// Server name (unique within a scope)
    pub name: String,
    #[serde(flatten)]
    pub spec: McpServerSpec,
}

impl McpServer {
    #[must_use]
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            spec: McpServerSpec {
                transport: None,
                command: Some(command.into()),
                args: args.iter().map(|a| (*a).to_string()).collect(),
                env: BTreeMap::new(),
                url: None,
                extra: BTreeMap::new(),
            },
        }
    }
}

/// Read the servers configured at a location, sorted by name
///
/// Entries that do not match the server schema are skipped with a
/// warning; they are still preserved when the file is rewritten.
pub fn read_servers(location: &McpLocation) -> LiveResult<Vec<McpServer>> {
    let content = match fs::read_to_string(&location.path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LiveError::io(&location.path, e)),
    };
    parse_servers(&location.path, &content, location.project_key.as_deref())
}

/// Parse servers out of file content
pub fn parse_servers(
    path: &Path,
    content: &str,
    project_key: Option<&str>,
) -> LiveResult<Vec<McpServer>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(content).map_err(|e| LiveError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let container = match project_key {
        Some(key) => root.get("projects").and_then(|p| p.get(key)),
        None => Some(&root),
    };
    let Some(servers) = container
        .and_then(|c| c.get("mcpServers"))
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };

    let mut result: Vec<McpServer> = servers
        .iter()
        .filter_map(|(name, value)| {
            match serde_json::from_value::<McpServerSpec>(value.clone()) {
                Ok(spec) => Some(McpServer {
                    name: name.clone(),
                    spec,
                }),
                Err(e) => {
                    tracing::warn!("Skipping MCP server '{name}' in {}: {e}", path.display());
                    None
                }
            }
        })
        .collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(result)
}
