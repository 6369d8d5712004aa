//! Declarative project pointer (`.claudeup.json`)
//!
//! Committed with the project, it names the profile the project expects.
//! Older pointers also carry a flat `plugins` list; it is still honored
//! for drift detection but no longer written.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use claudeup_live::PluginKey;

use crate::error::{CoreError, CoreResult};
use crate::profile::ProfileSource;
use crate::util::{read_json_value, write_json_atomic};

/// Pointer file name at the project root
pub const POINTER_FILE: &str = ".claudeup.json";

/// Current pointer schema version
pub const POINTER_VERSION: &str = "1";

/// Contents of `.claudeup.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPointer {
    #[serde(default = "default_version")]
    pub version: String,
    /// Profile the project expects
    pub profile: String,
    /// Store the profile was applied from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_source: Option<ProfileSource>,
    /// Deprecated flat plugin list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginKey>>,
}

fn default_version() -> String {
    POINTER_VERSION.to_string()
}

impl ProjectPointer {
    #[must_use]
    pub fn new(profile: impl Into<String>, source: ProfileSource) -> Self {
        Self {
            version: default_version(),
            profile: profile.into(),
            profile_source: Some(source),
            plugins: None,
        }
    }

    #[must_use]
    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(POINTER_FILE)
    }

    /// Read the pointer; a missing file is `None`
    pub fn read(project_dir: &Path) -> CoreResult<Option<Self>> {
        let path = Self::path(project_dir);
        let Some(value) = read_json_value(&path)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CoreError::ConfigUnreadable {
                path,
                message: e.to_string(),
            })
    }

    /// Read the pointer, failing if the project has none
    pub fn require(project_dir: &Path) -> CoreResult<Self> {
        Self::read(project_dir)?.ok_or_else(|| CoreError::NoPointer(project_dir.to_path_buf()))
    }

    pub fn write(&self, project_dir: &Path) -> CoreResult<()> {
        write_json_atomic(&Self::path(project_dir), self)
    }

    /// Whether the pointer already names this profile
    ///
    /// A legacy `plugins` list on the existing pointer is not a reason to
    /// rewrite it.
    #[must_use]
    pub fn points_to(&self, profile: &str, source: ProfileSource) -> bool {
        self.profile == profile && self.profile_source.map_or(true, |s| s == source)
    }
}
