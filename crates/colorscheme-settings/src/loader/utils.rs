//! Helper utilities for settings paths and values.

use crate::SettingsError;
use std::path::{Path, PathBuf};
use toml::Value;

/// Normalize a path by canonicalizing when possible, preserving NotFound.
pub(super) fn normalize_path(path: &Path) -> Result<PathBuf, SettingsError> {
    match path.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(SettingsError::File {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}

/// Produce a stable unique path used for de-duplication.
pub(super) fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Join nested paths for error messages and attribution keys.
pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Render a raw value the way it would appear in a settings file.
pub(crate) fn render_value(value: &Value) -> String {
    value.to_string()
}
