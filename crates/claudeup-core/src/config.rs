//! claudeup configuration
//!
//! Every root path and tunable lives here so that nothing downstream
//! reads environment variables or the home directory directly.

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use claudeup_live::paths::CLAUDE_CONFIG_DIR_ENV;
use claudeup_live::ClaudePaths;

use crate::error::{CoreError, CoreResult};

/// Environment variable that relocates claudeup's own directory
pub const CLAUDEUP_HOME_ENV: &str = "CLAUDEUP_HOME";

const DEFAULT_MAX_PARALLEL_INSTALLS: usize = 4;
const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 300;

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Claude Code file layout
    pub claude: ClaudePaths,
    /// claudeup's own directory (profiles, breadcrumbs)
    pub claudeup_dir: PathBuf,
    /// Upper bound on concurrent installs
    pub max_parallel_installs: usize,
    /// Timeout for each installer or hook subprocess
    pub install_timeout: Duration,
    /// Claude Code executable used for installs
    pub claude_bin: String,
}

/// Optional overrides in `<claudeup_dir>/config.json`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    max_parallel_installs: Option<usize>,
    install_timeout_secs: Option<u64>,
    claude_bin: Option<String>,
}

impl Config {
    /// Configuration fully rooted at `home`, with defaults
    #[must_use]
    pub fn with_home(home: &Path) -> Self {
        Self {
            claude: ClaudePaths::from_home(home),
            claudeup_dir: home.join(".claudeup"),
            max_parallel_installs: DEFAULT_MAX_PARALLEL_INSTALLS,
            install_timeout: Duration::from_secs(DEFAULT_INSTALL_TIMEOUT_SECS),
            claude_bin: "claude".to_string(),
        }
    }

    /// Load configuration for the current user
    ///
    /// Honors `CLAUDE_CONFIG_DIR` and `CLAUDEUP_HOME`, then applies the
    /// optional `config.json`. A malformed config file is logged and
    /// ignored.
    pub fn load() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(claudeup_live::LiveError::HomeNotFound)?;
        let mut config = Self::with_home(&home);

        if let Some(dir) = std::env::var_os(CLAUDE_CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            config.claude.claude_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(CLAUDEUP_HOME_ENV).filter(|v| !v.is_empty()) {
            config.claudeup_dir = PathBuf::from(dir);
        }

        match config.read_file() {
            Ok(file) => config.merge(file),
            Err(e) => tracing::warn!("Ignoring claudeup config: {e}"),
        }
        Ok(config)
    }

    fn read_file(&self) -> CoreResult<ConfigFile> {
        let path = self.config_file_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ConfigFile::default()),
            Err(e) => return Err(CoreError::io(&path, &e)),
        };
        serde_json::from_str(&content).map_err(|e| CoreError::ConfigUnreadable {
            path,
            message: e.to_string(),
        })
    }

    fn merge(&mut self, file: ConfigFile) {
        if let Some(n) = file.max_parallel_installs {
            self.max_parallel_installs = n.max(1);
        }
        if let Some(secs) = file.install_timeout_secs {
            self.install_timeout = Duration::from_secs(secs);
        }
        if let Some(bin) = file.claude_bin.filter(|b| !b.trim().is_empty()) {
            self.claude_bin = bin;
        }
    }

    /// Path of the optional config file
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.claudeup_dir.join("config.json")
    }

    /// Root of the user profile store
    #[must_use]
    pub fn user_profiles_dir(&self) -> PathBuf {
        self.claudeup_dir.join("profiles")
    }

    /// Root of the project profile store
    #[must_use]
    pub fn project_profiles_dir(project_dir: &Path) -> PathBuf {
        project_dir.join(".claudeup").join("profiles")
    }

    /// Breadcrumb file
    #[must_use]
    pub fn breadcrumb_path(&self) -> PathBuf {
        self.claudeup_dir.join("last-applied.json")
    }
}
