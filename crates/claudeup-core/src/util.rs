//! Utility functions for claudeup

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Names that can never be used as profile names
pub const RESERVED_NAMES: &[&str] = &["current"];

/// Validate a profile reference for use in store paths
///
/// Nested profiles use `/` as a namespace separator (`team/backend`);
/// each segment must be a plain file name.
pub fn validate_profile_name(name: &str) -> CoreResult<()> {
    let invalid = |reason: &str| CoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r)) {
        return Err(CoreError::Reserved(name.to_string()));
    }
    if name.contains('\\') {
        return Err(invalid("name contains a backslash"));
    }
    if name.contains('\0') {
        return Err(invalid("name contains a null byte"));
    }
    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(invalid("name has an empty path segment"));
        }
        if segment == ".." || segment.starts_with('.') {
            return Err(invalid("name segments cannot start with '.'"));
        }
    }
    Ok(())
}

/// Read a JSON file as an untyped value; a missing file is `None`
pub fn read_json_value(path: &Path) -> CoreResult<Option<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::io(path, &e)),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CoreError::ConfigUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Read a JSON object for rewriting
///
/// Malformed or non-object content is logged and replaced by an empty
/// object so the write can proceed.
pub fn read_json_object_or_empty(path: &Path) -> CoreResult<serde_json::Map<String, Value>> {
    match read_json_value(path) {
        Ok(Some(Value::Object(map))) => Ok(map),
        Ok(Some(_)) => {
            tracing::warn!("{} is not a JSON object; overwriting", path.display());
            Ok(serde_json::Map::new())
        }
        Ok(None) => Ok(serde_json::Map::new()),
        Err(CoreError::ConfigUnreadable { path, message }) => {
            tracing::warn!("{} is unreadable ({message}); overwriting", path.display());
            Ok(serde_json::Map::new())
        }
        Err(e) => Err(e),
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`
///
/// The content is written to a temporary file in the same directory and
/// renamed over the target, so a crash never leaves a truncated file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, &e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CoreError::io(dir, &e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| CoreError::io(path, &e))?;
    tmp.persist(path)
        .map_err(|e| CoreError::io(path, &e.error))?;
    Ok(())
}
