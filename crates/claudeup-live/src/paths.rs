//! Claude Code file layout
//!
//! All locations are derived from two roots (the `.claude` directory and
//! the `.claude.json` file) plus the project directory passed per call,
//! so tests can point everything at a temporary directory.

use std::path::{Path, PathBuf};

use crate::error::{LiveError, LiveResult};
use crate::scope::Scope;

/// Environment variable that relocates the `.claude` directory
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Root locations of Claude Code configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudePaths {
    /// User `.claude` directory
    pub claude_dir: PathBuf,
    /// User `.claude.json` (MCP servers for user and local scope)
    pub claude_json: PathBuf,
}

/// Where a scope's MCP servers live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpLocation {
    /// File holding the servers
    pub path: PathBuf,
    /// Key under `projects` when the servers are nested per project
    pub project_key: Option<String>,
}

impl ClaudePaths {
    /// Layout rooted at a home directory
    #[must_use]
    pub fn from_home(home: &Path) -> Self {
        Self {
            claude_dir: home.join(".claude"),
            claude_json: home.join(".claude.json"),
        }
    }

    /// Discover the layout for the current user, honoring `CLAUDE_CONFIG_DIR`
    pub fn discover() -> LiveResult<Self> {
        let home = dirs::home_dir().ok_or(LiveError::HomeNotFound)?;
        let mut paths = Self::from_home(&home);
        if let Some(dir) = std::env::var_os(CLAUDE_CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            paths.claude_dir = PathBuf::from(dir);
        }
        Ok(paths)
    }

    /// Enabled-plugin settings file for a scope
    #[must_use]
    pub fn settings_path(&self, scope: Scope, project_dir: &Path) -> PathBuf {
        match scope {
            Scope::User => self.claude_dir.join("settings.json"),
            Scope::Project => project_dir.join(".claude").join("settings.json"),
            Scope::Local => project_dir.join(".claude").join("settings.local.json"),
        }
    }

    /// Installed-plugin registry maintained by Claude Code
    #[must_use]
    pub fn installed_plugins_path(&self) -> PathBuf {
        self.claude_dir.join("plugins").join("installed_plugins.json")
    }

    /// Known-marketplace registry maintained by Claude Code
    #[must_use]
    pub fn known_marketplaces_path(&self) -> PathBuf {
        self.claude_dir.join("plugins").join("known_marketplaces.json")
    }

    /// MCP server location for a scope
    #[must_use]
    pub fn mcp_location(&self, scope: Scope, project_dir: &Path) -> McpLocation {
        match scope {
            Scope::User => McpLocation {
                path: self.claude_json.clone(),
                project_key: None,
            },
            Scope::Project => McpLocation {
                path: project_dir.join(".mcp.json"),
                project_key: None,
            },
            Scope::Local => McpLocation {
                path: self.claude_json.clone(),
                project_key: Some(project_dir.to_string_lossy().into_owned()),
            },
        }
    }
}

/// Resolve a project directory to an absolute, symlink-free path
///
/// Project-scoped install records are matched against this value, so
/// every caller must go through here.
pub fn canonical_project_dir(dir: &Path) -> LiveResult<PathBuf> {
    dir.canonicalize().map_err(|e| LiveError::io(dir, e))
}

/// Canonicalize when possible, otherwise keep the path as given
///
/// Registry entries may point at projects that no longer exist.
#[must_use]
pub fn normalize_recorded_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
