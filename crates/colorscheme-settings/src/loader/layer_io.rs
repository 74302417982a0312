//! IO helpers for reading settings layers from the schema and from disk.

use super::{APP_CONFIG_DIR, Layer, LoadedLayer, SETTINGS_FILE, transforms};
use crate::{Schema, SettingsError};
use directories::BaseDirs;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;

/// Build the defaults layer from every declared field default.
pub(super) fn default_layer(schema: &Schema) -> LoadedLayer {
    LoadedLayer {
        layer: Layer::Default,
        path: None,
        values: schema.defaults(),
        origins: BTreeMap::new(),
    }
}

/// Load a settings file if it exists; a missing file contributes nothing.
pub(super) fn load_optional_layer(
    layer: Layer,
    path: &Path,
) -> Result<Option<LoadedLayer>, SettingsError> {
    if !path.exists() {
        debug!(
            "optional layer missing (source={:?}, path={})",
            layer,
            path.display()
        );
        return Ok(None);
    }
    Ok(Some(load_required_layer(layer, path)?))
}

/// Read and parse a settings file. Keys are lower-cased.
pub(super) fn load_required_layer(layer: Layer, path: &Path) -> Result<LoadedLayer, SettingsError> {
    debug!(
        "loading settings layer (source={:?}, path={})",
        layer,
        path.display()
    );
    let contents = fs::read_to_string(path).map_err(|err| SettingsError::File {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let values = parse_settings(&contents).map_err(|reason| SettingsError::File {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(LoadedLayer {
        layer,
        path: Some(path.to_path_buf()),
        values,
        origins: BTreeMap::new(),
    })
}

fn parse_settings(contents: &str) -> Result<Table, String> {
    let table: Table =
        toml::from_str(contents).map_err(|err| err.to_string().trim_end().to_string())?;
    Ok(transforms::lowercase_keys(table))
}

/// Settings file inside a project root.
pub(super) fn project_settings_path(project_root: &Path) -> PathBuf {
    project_root.join(SETTINGS_FILE)
}

/// Per-user settings file: `$XDG_CONFIG_HOME/color-scheme/settings.toml`,
/// falling back to the platform config directory.
pub(super) fn default_user_settings_path(env: &BTreeMap<String, String>) -> Option<PathBuf> {
    let config_home = env
        .get("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))?;
    Some(config_home.join(APP_CONFIG_DIR).join(SETTINGS_FILE))
}
