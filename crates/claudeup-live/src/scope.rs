//! Configuration scopes
//!
//! Scopes are independent configuration targets. For "which profile is
//! active here" they form the precedence chain `local > project > user`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LiveError;

/// Where a setting is recorded
///
/// The derived ordering (user, project, local) is the fixed presentation
/// order used for deterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Machine-wide (~/.claude/settings.json)
    User,
    /// Committed and shared via VCS (.claude/settings.json)
    Project,
    /// Machine-specific, uncommitted (.claude/settings.local.json)
    Local,
}

impl Scope {
    /// All scopes in presentation order
    pub const ALL: [Scope; 3] = [Scope::User, Scope::Project, Scope::Local];

    /// Precedence for active-profile lookup (higher wins)
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Local => 3,
            Self::Project => 2,
            Self::User => 1,
        }
    }

    /// Scopes ordered from highest to lowest precedence
    #[must_use]
    pub fn by_precedence() -> [Scope; 3] {
        [Scope::Local, Scope::Project, Scope::User]
    }

    /// Whether this scope is tied to a project directory
    #[must_use]
    pub fn is_project_bound(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Lowercase name as used in files and flags
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = LiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "global" => Ok(Self::User),
            "project" => Ok(Self::Project),
            "local" => Ok(Self::Local),
            _ => Err(LiveError::InvalidScope(s.to_string())),
        }
    }
}
