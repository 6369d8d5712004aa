//! Error types for live state discovery

use std::path::PathBuf;
use thiserror::Error;

/// Result type for live state operations
pub type LiveResult<T> = Result<T, LiveError>;

/// Errors that can occur while reading live state
#[derive(Error, Debug)]
pub enum LiveError {
    /// IO error while reading a file
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file exists but is not valid JSON for its schema
    #[error("Config file {path} is unreadable: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Plugin key is not of the form `name@marketplace`
    #[error("Invalid plugin key '{0}' (expected name@marketplace)")]
    InvalidPluginKey(String),

    /// Unknown scope name
    #[error("Invalid scope: {0}. Use 'user', 'project', or 'local'")]
    InvalidScope(String),

    /// Home directory not found
    #[error("Home directory not found")]
    HomeNotFound,
}

impl LiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
