//! Enabled-plugin settings files
//!
//! Only the `enabledPlugins` key is interpreted; every other key in a
//! settings file belongs to the user and is left alone.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{LiveError, LiveResult};
use crate::plugin::PluginKey;

/// The `enabledPlugins` map of one settings file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledPlugins {
    /// Raw entries, including explicitly disabled ones
    pub entries: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    enabled_plugins: BTreeMap<String, bool>,
}

impl EnabledPlugins {
    /// Parse settings file content
    pub fn parse(path: &Path, content: &str) -> LiveResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawSettings =
            serde_json::from_str(content).map_err(|e| LiveError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            entries: raw.enabled_plugins,
        })
    }

    /// Read a settings file; a missing file is an empty map
    pub fn read(path: &Path) -> LiveResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LiveError::io(path, e)),
        }
    }

    /// Plugin keys whose value is `true`, in key order
    ///
    /// Entries that are not valid plugin keys are skipped.
    pub fn enabled(&self) -> Vec<PluginKey> {
        self.entries
            .iter()
            .filter(|(_, enabled)| **enabled)
            .filter_map(|(key, _)| match key.parse::<PluginKey>() {
                Ok(k) => Some(k),
                Err(e) => {
                    tracing::warn!("Ignoring enabledPlugins entry: {e}");
                    None
                }
            })
            .collect()
    }

    /// Whether a plugin is enabled in this file
    pub fn is_enabled(&self, key: &PluginKey) -> bool {
        self.entries.get(&key.to_string()).copied().unwrap_or(false)
    }
}
