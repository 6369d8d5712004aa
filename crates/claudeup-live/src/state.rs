//! LiveState - the installed and enabled truth on disk
//!
//! Loading never fails because of one bad file: an unreadable file is
//! recorded as a warning and treated as absent, and the other scopes are
//! still read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::LiveError;
use crate::mcp::{read_servers, McpServer};
use crate::paths::ClaudePaths;
use crate::plugin::PluginKey;
use crate::registry::{InstalledRegistry, KnownMarketplaces};
use crate::scope::Scope;
use crate::settings::EnabledPlugins;

/// A file that could not be read and was treated as absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWarning {
    /// Offending file
    pub path: PathBuf,
    /// What went wrong
    pub message: String,
}

/// Snapshot of live configuration as seen from one project directory
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    /// Canonical project directory the state was loaded for
    pub project_dir: PathBuf,
    /// `enabledPlugins` per scope
    pub settings: BTreeMap<Scope, EnabledPlugins>,
    /// Installed-plugin registry
    pub registry: InstalledRegistry,
    /// Known marketplaces
    pub marketplaces: KnownMarketplaces,
    /// MCP servers per scope
    pub mcp_servers: BTreeMap<Scope, Vec<McpServer>>,
    /// Files that were unreadable
    pub warnings: Vec<LiveWarning>,
}

impl LiveState {
    /// Load all live state visible from `project_dir`
    ///
    /// `project_dir` must already be canonical.
    pub fn load(paths: &ClaudePaths, project_dir: &Path) -> Self {
        let mut state = Self {
            project_dir: project_dir.to_path_buf(),
            ..Self::default()
        };

        for scope in Scope::ALL {
            let path = paths.settings_path(scope, project_dir);
            let plugins = state.absorb(EnabledPlugins::read(&path), &path);
            state.settings.insert(scope, plugins);

            let location = paths.mcp_location(scope, project_dir);
            let servers = state.absorb(read_servers(&location), &location.path);
            state.mcp_servers.insert(scope, servers);
        }

        let registry_path = paths.installed_plugins_path();
        state.registry = state.absorb(InstalledRegistry::read(&registry_path), &registry_path);

        let known_path = paths.known_marketplaces_path();
        state.marketplaces = state.absorb(KnownMarketplaces::read(&known_path), &known_path);

        state
    }

    fn absorb<T: Default>(&mut self, result: Result<T, LiveError>, path: &Path) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Treating {} as absent: {e}", path.display());
                if !self.warnings.iter().any(|w| w.path == path) {
                    self.warnings.push(LiveWarning {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                T::default()
            }
        }
    }

    /// Enabled plugin keys at a scope
    pub fn enabled(&self, scope: Scope) -> Vec<PluginKey> {
        self.settings
            .get(&scope)
            .map(EnabledPlugins::enabled)
            .unwrap_or_default()
    }

    /// Raw `enabledPlugins` entries at a scope
    pub fn settings_for(&self, scope: Scope) -> &EnabledPlugins {
        static EMPTY: std::sync::OnceLock<EnabledPlugins> = std::sync::OnceLock::new();
        self.settings
            .get(&scope)
            .unwrap_or_else(|| EMPTY.get_or_init(EnabledPlugins::default))
    }

    /// MCP servers at a scope
    pub fn servers(&self, scope: Scope) -> &[McpServer] {
        self.mcp_servers.get(&scope).map_or(&[], Vec::as_slice)
    }

    /// Whether a plugin is installed for `scope` in this project
    pub fn is_installed(&self, key: &PluginKey, scope: Scope) -> bool {
        self.registry.is_installed(key, scope, &self.project_dir)
    }
}
