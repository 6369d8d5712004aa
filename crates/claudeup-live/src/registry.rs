//! Installed-plugin and known-marketplace registries
//!
//! Claude Code keeps every install record in one global file keyed by
//! plugin, with a list of per-scope (and per-project) records. The
//! registry builds a secondary index once at load time so lookups for
//! "is this plugin installed for this project" never rescan the list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LiveError, LiveResult};
use crate::paths::normalize_recorded_path;
use crate::plugin::PluginKey;
use crate::scope::Scope;

/// One install record for a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRecord {
    /// Scope the plugin was installed at
    pub scope: Scope,
    /// Project the install belongs to (project/local scope)
    pub project_path: Option<PathBuf>,
    /// Installed version
    pub version: String,
    /// Where the plugin files live
    pub install_path: PathBuf,
    /// Install timestamp as recorded by Claude Code
    pub installed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstalledPlugins {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    plugins: BTreeMap<String, Vec<RawPluginInstall>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPluginInstall {
    #[serde(default)]
    scope: String,
    project_path: Option<String>,
    #[serde(default)]
    install_path: String,
    #[serde(default)]
    version: String,
    installed_at: Option<String>,
}

type IndexKey = (String, Scope, Option<PathBuf>);

/// Parsed `installed_plugins.json` with a `(plugin, scope, project)` index
#[derive(Debug, Clone, Default)]
pub struct InstalledRegistry {
    /// Registry schema version
    pub version: u32,
    /// Records per plugin key
    pub plugins: BTreeMap<String, Vec<InstallRecord>>,
    index: HashMap<IndexKey, InstallRecord>,
}

impl InstalledRegistry {
    /// Parse registry content
    pub fn parse(path: &Path, content: &str) -> LiveResult<Self> {
        let raw: RawInstalledPlugins =
            serde_json::from_str(content).map_err(|e| LiveError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut plugins = BTreeMap::new();
        for (key, installs) in raw.plugins {
            let records: Vec<InstallRecord> = installs
                .into_iter()
                .filter_map(|install| {
                    let scope = match install.scope.parse::<Scope>() {
                        Ok(scope) => scope,
                        Err(_) => {
                            tracing::debug!(
                                "Skipping {key} install record with scope '{}'",
                                install.scope
                            );
                            return None;
                        }
                    };
                    Some(InstallRecord {
                        scope,
                        project_path: install.project_path.map(PathBuf::from),
                        version: install.version,
                        install_path: PathBuf::from(install.install_path),
                        installed_at: install.installed_at,
                    })
                })
                .collect();
            plugins.insert(key, records);
        }

        Ok(Self::from_records(raw.version, plugins))
    }

    /// Build a registry (and its index) from records
    #[must_use]
    pub fn from_records(version: u32, plugins: BTreeMap<String, Vec<InstallRecord>>) -> Self {
        let mut index = HashMap::new();
        for (key, records) in &plugins {
            for record in records {
                let project = match record.scope {
                    Scope::User => None,
                    Scope::Project | Scope::Local => record
                        .project_path
                        .as_deref()
                        .map(normalize_recorded_path),
                };
                index.insert((key.clone(), record.scope, project), record.clone());
            }
        }
        Self {
            version,
            plugins,
            index,
        }
    }

    /// Read the registry; a missing file is an empty registry
    pub fn read(path: &Path) -> LiveResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LiveError::io(path, e)),
        }
    }

    /// The install record that applies to `scope` as seen from `project_dir`
    ///
    /// Project and local records only count when their `projectPath`
    /// is the given (canonical) project directory.
    pub fn record_for(
        &self,
        key: &PluginKey,
        scope: Scope,
        project_dir: &Path,
    ) -> Option<&InstallRecord> {
        let project = scope.is_project_bound().then(|| project_dir.to_path_buf());
        self.index.get(&(key.to_string(), scope, project))
    }

    /// Whether a plugin is installed for `scope` as seen from `project_dir`
    pub fn is_installed(&self, key: &PluginKey, scope: Scope, project_dir: &Path) -> bool {
        self.record_for(key, scope, project_dir).is_some()
    }

    /// Number of plugin keys with at least one record
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Where a marketplace comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum MarketplaceSource {
    #[serde(rename = "github")]
    GitHub { repo: String },
    #[serde(rename = "git")]
    Git { url: String },
    #[serde(rename = "local")]
    Local { path: String },
}

impl MarketplaceSource {
    /// Source kind as written in profiles
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GitHub { .. } => "github",
            Self::Git { .. } => "git",
            Self::Local { .. } => "local",
        }
    }

    /// Repository, URL, or path
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::GitHub { repo } => repo,
            Self::Git { url } => url,
            Self::Local { path } => path,
        }
    }
}

/// A marketplace Claude Code already knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownMarketplace {
    /// Marketplace name (the part after `@` in plugin keys)
    pub name: String,
    /// Source location
    pub source: MarketplaceSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarketplaceEntry {
    source: MarketplaceSource,
}

/// Parsed `known_marketplaces.json`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownMarketplaces {
    /// Marketplaces by name
    pub entries: BTreeMap<String, KnownMarketplace>,
}

impl KnownMarketplaces {
    /// Parse registry content
    pub fn parse(path: &Path, content: &str) -> LiveResult<Self> {
        let raw: BTreeMap<String, RawMarketplaceEntry> =
            serde_json::from_str(content).map_err(|e| LiveError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            entries: raw
                .into_iter()
                .map(|(name, entry)| {
                    let known = KnownMarketplace {
                        name: name.clone(),
                        source: entry.source,
                    };
                    (name, known)
                })
                .collect(),
        })
    }

    /// Read the registry; a missing file is empty
    pub fn read(path: &Path) -> LiveResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LiveError::io(path, e)),
        }
    }

    /// Whether a marketplace with this repository/URL/path is known
    pub fn contains_location(&self, location: &str) -> bool {
        let wanted = location.trim_end_matches(".git");
        self.entries
            .values()
            .any(|m| m.source.location().trim_end_matches(".git") == wanted)
    }
}
