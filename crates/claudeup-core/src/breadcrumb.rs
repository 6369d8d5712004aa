//! Breadcrumbs - which profile was last applied at each scope
//!
//! The store is an explicit file-backed map passed by reference; there is
//! no process-wide "active profile" state. Breadcrumbs are only written as
//! a side effect of a successful apply, and follow their profile through
//! delete and rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use claudeup_live::Scope;

use crate::error::CoreResult;
use crate::util::{read_json_value, write_json_atomic};

/// Record of the last profile applied at one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    /// Profile reference
    pub profile: String,
    /// When it was applied
    pub applied_at: DateTime<Utc>,
    /// Project the apply ran in (project and local scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
}

/// On-disk layout of `last-applied.json`
///
/// Project and local breadcrumbs are keyed by project directory so that
/// applying in one project never disturbs another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Breadcrumb>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project: BTreeMap<String, Breadcrumb>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub local: BTreeMap<String, Breadcrumb>,
}

fn project_key(project_dir: &Path) -> String {
    project_dir.to_string_lossy().into_owned()
}

impl BreadcrumbFile {
    fn slot(&self, scope: Scope, project_dir: &Path) -> Option<&Breadcrumb> {
        match scope {
            Scope::User => self.user.as_ref(),
            Scope::Project => self.project.get(&project_key(project_dir)),
            Scope::Local => self.local.get(&project_key(project_dir)),
        }
    }

    fn insert(&mut self, scope: Scope, project_dir: &Path, crumb: Breadcrumb) {
        match scope {
            Scope::User => self.user = Some(crumb),
            Scope::Project => {
                self.project.insert(project_key(project_dir), crumb);
            }
            Scope::Local => {
                self.local.insert(project_key(project_dir), crumb);
            }
        }
    }

    fn crumbs_mut(&mut self) -> impl Iterator<Item = &mut Breadcrumb> {
        self.user
            .iter_mut()
            .chain(self.project.values_mut())
            .chain(self.local.values_mut())
    }

    /// Number of breadcrumbs across all scopes and projects
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.user.is_some()) + self.project.len() + self.local.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&mut self, keep: impl Fn(&Breadcrumb) -> bool) {
        if self.user.as_ref().is_some_and(|crumb| !keep(crumb)) {
            self.user = None;
        }
        self.project.retain(|_, crumb| keep(crumb));
        self.local.retain(|_, crumb| keep(crumb));
    }
}

/// File-backed breadcrumb map
#[derive(Debug, Clone)]
pub struct BreadcrumbStore {
    path: PathBuf,
}

impl BreadcrumbStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All breadcrumbs; an unreadable file is logged and treated as empty
    pub fn load(&self) -> BreadcrumbFile {
        let value = match read_json_value(&self.path) {
            Ok(Some(value)) => value,
            Ok(None) => return BreadcrumbFile::default(),
            Err(e) => {
                tracing::warn!("Ignoring breadcrumbs: {e}");
                return BreadcrumbFile::default();
            }
        };
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Ignoring breadcrumbs in {}: {e}", self.path.display());
            BreadcrumbFile::default()
        })
    }

    fn save(&self, crumbs: &BreadcrumbFile) -> CoreResult<()> {
        write_json_atomic(&self.path, crumbs)
    }

    /// Breadcrumb for `scope` as seen from `project_dir`
    ///
    /// Project and local breadcrumbs only count in the project they were
    /// recorded for.
    pub fn get(&self, scope: Scope, project_dir: &Path) -> Option<Breadcrumb> {
        self.load().slot(scope, project_dir).cloned()
    }

    /// Record an apply; returns false (and writes nothing) if unchanged
    pub fn record(&self, scope: Scope, profile: &str, project_dir: &Path) -> CoreResult<bool> {
        let mut crumbs = self.load();
        if crumbs
            .slot(scope, project_dir)
            .is_some_and(|existing| existing.profile == profile)
        {
            return Ok(false);
        }

        crumbs.insert(
            scope,
            project_dir,
            Breadcrumb {
                profile: profile.to_string(),
                applied_at: Utc::now(),
                project_dir: scope.is_project_bound().then(|| project_dir.to_path_buf()),
            },
        );
        self.save(&crumbs)?;
        tracing::info!("Recorded '{profile}' as applied at {scope} scope");
        Ok(true)
    }

    /// Whether recording `profile` at `scope` would change anything
    pub fn is_current(&self, scope: Scope, profile: &str, project_dir: &Path) -> bool {
        self.get(scope, project_dir)
            .is_some_and(|crumb| crumb.profile == profile)
    }

    /// Remove breadcrumbs pointing at a deleted profile, in every project
    pub fn forget_profile(&self, profile: &str) -> CoreResult<usize> {
        let mut crumbs = self.load();
        let before = crumbs.len();
        crumbs.retain(|crumb| crumb.profile != profile);
        let removed = before - crumbs.len();
        if removed > 0 {
            self.save(&crumbs)?;
        }
        Ok(removed)
    }

    /// Point breadcrumbs of a renamed profile at its new name, in every project
    pub fn rename_profile(&self, old: &str, new: &str) -> CoreResult<usize> {
        let mut crumbs = self.load();
        let mut renamed = 0;
        for crumb in crumbs.crumbs_mut() {
            if crumb.profile == old {
                crumb.profile = new.to_string();
                renamed += 1;
            }
        }
        if renamed > 0 {
            self.save(&crumbs)?;
        }
        Ok(renamed)
    }
}

impl From<&crate::config::Config> for BreadcrumbStore {
    fn from(config: &crate::config::Config) -> Self {
        Self::new(config.breadcrumb_path())
    }
}
