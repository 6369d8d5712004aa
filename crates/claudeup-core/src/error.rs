//! Error taxonomy for the profile engine

use std::path::PathBuf;
use thiserror::Error;

use claudeup_live::{LiveError, Scope};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the profile engine
#[derive(Debug, Error)]
pub enum CoreError {
    /// Profile does not exist in any store
    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    /// Plugin or marketplace does not exist where it was expected
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The same profile name exists in more than one place
    #[error("Profile '{name}' is ambiguous; it exists as: {}", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    /// Include graph contains a cycle
    #[error("Cyclic include detected: {}", chain.join(" -> "))]
    CyclicInclude { chain: Vec<String> },

    /// Two included profiles define the same MCP server differently
    #[error(
        "MCP server '{server}' ({scope} scope) is defined differently by '{first}' and '{second}'"
    )]
    ConflictingMcpServer {
        server: String,
        scope: Scope,
        first: String,
        second: String,
    },

    /// Reserved name used as a target
    #[error("'{0}' is a reserved name and cannot be used as a profile name")]
    Reserved(String),

    /// Name cannot be used as a profile file name
    #[error("Invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Profile already exists
    #[error("Profile '{0}' already exists")]
    AlreadyExists(String),

    /// A stack was applied with an explicit scope
    #[error("Profile '{0}' is a stack; stacks are applied as a whole and cannot take --scope")]
    StackWithScope(String),

    /// No breadcrumb for a pinned scope
    #[error("No profile has been applied at {0} scope")]
    NoActiveProfile(Scope),

    /// No declarative pointer in the project
    #[error("No .claudeup.json found in {0}")]
    NoPointer(PathBuf),

    /// Config file is malformed
    #[error("Config file {path} is unreadable: {message}")]
    ConfigUnreadable { path: PathBuf, message: String },

    /// One or more installs failed; other items were still attempted
    #[error("{} install(s) failed: {}", failed.len(), failed.join(", "))]
    InstallFailure { failed: Vec<String> },

    /// Post-apply hook failed after settings were committed
    #[error("Post-apply hook '{command}' failed ({reason}); settings were already applied")]
    HookFailure { command: String, reason: String },

    /// Live state error
    #[error(transparent)]
    Live(#[from] LiveError),

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable error code for CLI output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProfileNotFound { .. } | Self::NotFound { .. } => "NOT_FOUND",
            Self::Ambiguous { .. } => "AMBIGUOUS",
            Self::CyclicInclude { .. } => "CYCLIC_INCLUDE",
            Self::ConflictingMcpServer { .. } => "CONFLICT",
            Self::Reserved(_) => "RESERVED",
            Self::InvalidName { .. } | Self::StackWithScope(_) => "VALIDATION_ERROR",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NoActiveProfile(_) | Self::NoPointer(_) => "NOT_FOUND",
            Self::ConfigUnreadable { .. } => "PARSE_ERROR",
            Self::InstallFailure { .. } => "INSTALL_FAILURE",
            Self::HookFailure { .. } => "HOOK_FAILURE",
            Self::Live(_) | Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "PARSE_ERROR",
        }
    }

    /// One-line command that helps the user recover
    #[must_use]
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::ProfileNotFound { .. } | Self::Reserved(_) | Self::InvalidName { .. } => {
                Some("claudeup profile list".to_string())
            }
            Self::NotFound { .. } => Some("claudeup status".to_string()),
            Self::Ambiguous { candidates, .. } => candidates
                .first()
                .map(|c| format!("claudeup profile show {c}")),
            Self::CyclicInclude { chain } => chain
                .first()
                .map(|name| format!("claudeup profile show {name}")),
            Self::ConflictingMcpServer { first, .. } => {
                Some(format!("claudeup profile show {first}"))
            }
            Self::AlreadyExists(name) => Some(format!("claudeup profile delete {name}")),
            Self::StackWithScope(name) => Some(format!("claudeup profile apply {name}")),
            Self::NoActiveProfile(_) => Some("claudeup profile apply <name>".to_string()),
            Self::NoPointer(_) => Some("claudeup profile apply <name> --scope project".to_string()),
            Self::InstallFailure { .. } => Some("claudeup profile apply <name> --reinstall".to_string()),
            Self::HookFailure { .. } => Some("claudeup status".to_string()),
            Self::ConfigUnreadable { path, .. } => Some(format!("check {}", path.display())),
            Self::Live(_) | Self::Io { .. } | Self::Json(_) => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
