//! Profile store
//!
//! Profiles live as JSON documents under two roots: the user store
//! (`~/.claudeup/profiles`) and the project store
//! (`<project>/.claudeup/profiles`). A profile `group/name` is stored at
//! `<root>/group/name.json`.
//!
//! Lookup rules:
//! - a path reference (`group/name`) resolves directly, project store
//!   first, and never needs disambiguation;
//! - a plain name matches every profile with that leaf name in either
//!   store; more than one match is [`CoreError::Ambiguous`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::breadcrumb::BreadcrumbStore;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::util::{read_json_value, validate_profile_name, write_json_atomic};

use super::document::ProfileDocument;
use super::types::Profile;

const PROFILE_EXT: &str = "json";

/// Which store a profile lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    User,
    Project,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Where a profile document lives
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProfileLocation {
    /// Store reference (`name` or `group/name`)
    pub reference: String,
    /// Store it lives in
    pub source: ProfileSource,
    /// Document path
    pub path: PathBuf,
}

impl ProfileLocation {
    /// Leaf name (last path segment)
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.reference.rsplit('/').next().unwrap_or(&self.reference)
    }
}

impl fmt::Display for ProfileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reference, self.source)
    }
}

/// User and project profile stores
#[derive(Debug, Clone)]
pub struct ProfileStore {
    user_root: PathBuf,
    project_root: Option<PathBuf>,
}

impl ProfileStore {
    #[must_use]
    pub fn new(user_root: impl Into<PathBuf>, project_root: Option<PathBuf>) -> Self {
        Self {
            user_root: user_root.into(),
            project_root,
        }
    }

    /// Stores for the configured user and the given project directory
    #[must_use]
    pub fn from_config(config: &Config, project_dir: &Path) -> Self {
        Self::new(
            config.user_profiles_dir(),
            Some(Config::project_profiles_dir(project_dir)),
        )
    }

    /// Root directory of a store
    #[must_use]
    pub fn root(&self, source: ProfileSource) -> Option<&Path> {
        match source {
            ProfileSource::User => Some(&self.user_root),
            ProfileSource::Project => self.project_root.as_deref(),
        }
    }

    fn roots(&self) -> Vec<(ProfileSource, &Path)> {
        let mut roots = Vec::new();
        if let Some(root) = self.root(ProfileSource::Project) {
            roots.push((ProfileSource::Project, root));
        }
        roots.push((ProfileSource::User, self.user_root.as_path()));
        roots
    }

    fn document_path(root: &Path, reference: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        let mut segments = reference.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}.{PROFILE_EXT}"));
            }
        }
        path
    }

    /// Every profile in both stores, sorted by reference then source
    pub fn list(&self) -> CoreResult<Vec<ProfileLocation>> {
        let mut locations = Vec::new();
        for (source, root) in self.roots() {
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(root)
                .follow_links(false)
                .max_depth(8)
                .into_iter()
                .filter_map(Result::ok)
            {
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXT)
                {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let reference = relative
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                if validate_profile_name(&reference).is_err() {
                    continue;
                }
                locations.push(ProfileLocation {
                    reference,
                    source,
                    path: path.to_path_buf(),
                });
            }
        }
        locations.sort_by(|a, b| {
            a.reference
                .cmp(&b.reference)
                .then_with(|| a.source.cmp(&b.source))
        });
        Ok(locations)
    }

    /// All candidate locations for a reference
    pub fn find(&self, reference: &str) -> CoreResult<Vec<ProfileLocation>> {
        validate_profile_name(reference)?;

        if reference.contains('/') {
            let found = self.roots().into_iter().find_map(|(source, root)| {
                let path = Self::document_path(root, reference);
                path.is_file().then(|| ProfileLocation {
                    reference: reference.to_string(),
                    source,
                    path,
                })
            });
            return Ok(found.into_iter().collect());
        }

        Ok(self
            .list()?
            .into_iter()
            .filter(|loc| loc.leaf() == reference)
            .collect())
    }

    /// Whether any profile matches the reference
    pub fn exists(&self, reference: &str) -> bool {
        self.find(reference).is_ok_and(|found| !found.is_empty())
    }

    /// Resolve a reference to exactly one location
    pub fn locate(&self, reference: &str) -> CoreResult<ProfileLocation> {
        self.locate_with(reference, |_| None)
    }

    /// Resolve a reference, letting `choose` pick among ambiguous matches
    ///
    /// `choose` returns the index of the chosen candidate, or `None` to
    /// leave the reference ambiguous.
    pub fn locate_with<F>(&self, reference: &str, choose: F) -> CoreResult<ProfileLocation>
    where
        F: FnOnce(&[ProfileLocation]) -> Option<usize>,
    {
        let mut found = self.find(reference)?;
        match found.len() {
            0 => Err(CoreError::ProfileNotFound {
                name: reference.to_string(),
            }),
            1 => Ok(found.remove(0)),
            _ => match choose(&found) {
                Some(i) if i < found.len() => Ok(found.remove(i)),
                _ => Err(CoreError::Ambiguous {
                    name: reference.to_string(),
                    candidates: found.iter().map(ToString::to_string).collect(),
                }),
            },
        }
    }

    /// Load the profile a reference resolves to
    pub fn load(&self, reference: &str) -> CoreResult<Profile> {
        let location = self.locate(reference)?;
        self.load_at(&location)
    }

    /// Load a profile, letting `choose` pick among ambiguous matches
    pub fn load_with<F>(&self, reference: &str, choose: F) -> CoreResult<Profile>
    where
        F: FnOnce(&[ProfileLocation]) -> Option<usize>,
    {
        let location = self.locate_with(reference, choose)?;
        self.load_at(&location)
    }

    /// Load the profile at a known location
    pub fn load_at(&self, location: &ProfileLocation) -> CoreResult<Profile> {
        let value = read_json_value(&location.path)?.ok_or_else(|| CoreError::ConfigUnreadable {
            path: location.path.clone(),
            message: "file is empty".to_string(),
        })?;
        let document: ProfileDocument =
            serde_json::from_value(value).map_err(|e| CoreError::ConfigUnreadable {
                path: location.path.clone(),
                message: e.to_string(),
            })?;
        Ok(document.into_profile(&location.reference))
    }

    /// Write a profile to a store, replacing any existing document
    pub fn save(&self, profile: &Profile, source: ProfileSource) -> CoreResult<ProfileLocation> {
        validate_profile_name(&profile.name)?;
        let root = self.root(source).ok_or_else(|| CoreError::NotFound {
            kind: "Project store",
            name: profile.name.clone(),
        })?;
        let path = Self::document_path(root, &profile.name);
        write_json_atomic(&path, &ProfileDocument::from_profile(profile))?;
        tracing::info!("Saved profile '{}' to {}", profile.name, path.display());
        Ok(ProfileLocation {
            reference: profile.name.clone(),
            source,
            path,
        })
    }

    /// Delete a profile and the breadcrumbs that point at it
    pub fn delete(
        &self,
        reference: &str,
        breadcrumbs: &BreadcrumbStore,
    ) -> CoreResult<ProfileLocation> {
        let location = self.locate(reference)?;
        self.delete_at(&location, breadcrumbs)?;
        Ok(location)
    }

    /// Delete the profile at a known location
    pub fn delete_at(
        &self,
        location: &ProfileLocation,
        breadcrumbs: &BreadcrumbStore,
    ) -> CoreResult<()> {
        fs::remove_file(&location.path).map_err(|e| CoreError::io(&location.path, &e))?;
        breadcrumbs.forget_profile(&location.reference)?;
        tracing::info!("Deleted profile '{location}'");
        Ok(())
    }

    /// Rename a profile within its store, carrying breadcrumbs along
    pub fn rename(
        &self,
        reference: &str,
        new_name: &str,
        breadcrumbs: &BreadcrumbStore,
    ) -> CoreResult<ProfileLocation> {
        let location = self.locate(reference)?;
        self.rename_at(&location, new_name, breadcrumbs)
    }

    /// Rename the profile at a known location
    pub fn rename_at(
        &self,
        location: &ProfileLocation,
        new_name: &str,
        breadcrumbs: &BreadcrumbStore,
    ) -> CoreResult<ProfileLocation> {
        validate_profile_name(new_name)?;
        let root = self
            .root(location.source)
            .ok_or_else(|| CoreError::ProfileNotFound {
                name: location.reference.clone(),
            })?;
        if Self::document_path(root, new_name).exists() {
            return Err(CoreError::AlreadyExists(new_name.to_string()));
        }

        let mut profile = self.load_at(location)?;
        profile.name = new_name.to_string();
        let renamed = self.save(&profile, location.source)?;
        fs::remove_file(&location.path).map_err(|e| CoreError::io(&location.path, &e))?;
        breadcrumbs.rename_profile(&location.reference, new_name)?;
        Ok(renamed)
    }
}
