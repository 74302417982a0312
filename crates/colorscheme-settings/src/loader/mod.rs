//! Layered settings resolution.
//!
//! Layers, lowest precedence first: schema defaults, the project file, the
//! user file, environment variables, and command-line overrides. Every layer
//! is read into a neutral TOML table, the tables are deep-merged, and the
//! merged tree is validated once against the unified schema.

mod env;
mod layer_io;
mod merge;
mod overrides;
mod resolve;
mod transforms;
mod utils;
pub(crate) mod validate;


pub use env::{DEFAULT_ENV_PREFIX, Environment, TEMPLATES_DIR_VARIABLE};
pub use merge::{deep_merge, merge_layers};
pub use overrides::{Overrides, apply_overrides};
pub use resolve::{ResolvedConfig, ResolvedValue, ShadowedValue};

use crate::{Schema, SchemaRegistry, SettingsError, UnifiedConfig};
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml::Table;

/// Settings filename in the project root and the user config directory.
const SETTINGS_FILE: &str = "settings.toml";
/// Application directory under the user config home.
const APP_CONFIG_DIR: &str = "color-scheme";
/// Source detail reported for values taken from schema defaults.
const DEFAULT_SOURCE_DETAIL: &str = "schema default";

/// Origin of a settings layer, ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Defaults declared by the registered schemas.
    Default,
    /// `settings.toml` in the project root.
    Project,
    /// Per-user `settings.toml`.
    User,
    /// Prefixed environment variables.
    Env,
    /// Command-line overrides (highest precedence).
    Cli,
}

impl Layer {
    pub fn label(self) -> &'static str {
        match self {
            Layer::Default => "default",
            Layer::Project => "project",
            Layer::User => "user",
            Layer::Env => "env",
            Layer::Cli => "cli",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Options controlling where layers are read from.
#[derive(Debug, Clone)]
pub struct SettingsOptions {
    /// Directory holding the project `settings.toml` (defaults to the current
    /// directory at load time).
    pub project_root: Option<PathBuf>,
    /// User settings file (defaults to
    /// `$XDG_CONFIG_HOME/color-scheme/settings.toml`).
    pub user_config_path: Option<PathBuf>,
    /// Source of environment variables.
    pub environment: Environment,
    /// Prefix marking settings variables.
    pub env_prefix: String,
}

impl Default for SettingsOptions {
    fn default() -> Self {
        Self {
            project_root: None,
            user_config_path: None,
            environment: Environment::Process,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl SettingsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_root(mut self, root: impl AsRef<Path>) -> Self {
        self.project_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn with_user_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.user_config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }
}

/// Lifecycle of a [`SettingsContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// `configure` has not been called.
    Unconfigured,
    /// Configured, nothing cached.
    Configured,
    /// A validated configuration is cached.
    Loaded,
}

/// One layer's contribution before merging.
#[derive(Debug, Clone)]
pub(crate) struct LoadedLayer {
    pub(crate) layer: Layer,
    /// File the layer was read from, for file layers.
    pub(crate) path: Option<PathBuf>,
    pub(crate) values: Table,
    /// Variable name or override text per dotted path.
    pub(crate) origins: BTreeMap<String, String>,
}

impl LoadedLayer {
    fn detail(&self, dotted: &str) -> String {
        if let Some(origin) = self.origins.get(dotted) {
            return origin.clone();
        }
        match (&self.path, self.layer) {
            (Some(path), _) => path.display().to_string(),
            (None, Layer::Default) => DEFAULT_SOURCE_DETAIL.to_string(),
            (None, layer) => layer.label().to_string(),
        }
    }
}

#[derive(Debug)]
struct Setup {
    schema: Arc<Schema>,
    options: SettingsOptions,
}

#[derive(Debug, Default)]
struct PipelineInner {
    setup: Option<Setup>,
    cached: Option<Arc<UnifiedConfig>>,
}

/// Owns the configured schema, the layer options, and the cached result.
///
/// Safe to share between threads. Loading runs under the context's lock, so
/// concurrent first calls perform the layer reads once and all receive the
/// same `Arc`.
#[derive(Debug, Default)]
pub struct SettingsContext {
    inner: Mutex<PipelineInner>,
}

impl SettingsContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the unified schema and options, dropping any cached config.
    pub fn configure(&self, schema: impl Into<Arc<Schema>>, options: SettingsOptions) {
        let schema = schema.into();
        info!(
            "configuring settings (namespaces={}, project_root={:?}, user_config={:?})",
            schema.len(),
            options.project_root,
            options.user_config_path
        );
        let mut inner = self.inner.lock();
        inner.setup = Some(Setup { schema, options });
        inner.cached = None;
    }

    /// Configure with every namespace in `registry`.
    pub fn configure_registry(&self, registry: &SchemaRegistry, options: SettingsOptions) {
        self.configure(registry.unified_schema(), options);
    }

    pub fn state(&self) -> PipelineState {
        let inner = self.inner.lock();
        match (&inner.setup, &inner.cached) {
            (None, _) => PipelineState::Unconfigured,
            (Some(_), None) => PipelineState::Configured,
            (Some(_), Some(_)) => PipelineState::Loaded,
        }
    }

    /// Read, merge, and validate every layer below the command line.
    ///
    /// The first successful call caches its result; later calls return the
    /// same `Arc` without touching the filesystem or environment.
    pub fn load_config(&self) -> Result<Arc<UnifiedConfig>, SettingsError> {
        let mut inner = self.inner.lock();
        load_locked(&mut inner)
    }

    /// Drop the cache and load again. On failure the cache stays empty.
    pub fn reload_config(&self) -> Result<Arc<UnifiedConfig>, SettingsError> {
        let mut inner = self.inner.lock();
        inner.cached = None;
        debug!("settings cache cleared for reload");
        load_locked(&mut inner)
    }

    /// The cached configuration, or a fresh one with `overrides` applied.
    ///
    /// Without overrides (or with an empty set) the cached `Arc` itself is
    /// returned. With overrides the cache is neither consulted for mutation
    /// nor replaced.
    pub fn get_config(
        &self,
        overrides: Option<&Overrides>,
    ) -> Result<Arc<UnifiedConfig>, SettingsError> {
        let base = self.load_config()?;
        match overrides {
            Some(overrides) if !overrides.is_empty() => {
                debug!("applying settings overrides (count={})", overrides.len());
                Ok(Arc::new(apply_overrides(&base, overrides)?))
            }
            _ => Ok(base),
        }
    }

    /// Resolve every layer afresh and report where each value came from.
    ///
    /// Diagnostic path: the cache is neither read nor written.
    pub fn resolve_with_sources(
        &self,
        overrides: Option<&Overrides>,
    ) -> Result<ResolvedConfig, SettingsError> {
        let inner = self.inner.lock();
        let setup = inner.setup.as_ref().ok_or(SettingsError::NotConfigured)?;
        let mut layers = read_layers(setup)?;
        if let Some(overrides) = overrides.filter(|overrides| !overrides.is_empty()) {
            layers.push(overrides.to_layer(&setup.schema)?);
        }
        let config = validate_layers(&setup.schema, &layers)?;
        Ok(resolve::attribute(&config, &layers))
    }
}

fn load_locked(inner: &mut PipelineInner) -> Result<Arc<UnifiedConfig>, SettingsError> {
    if let Some(cached) = &inner.cached {
        debug!("returning cached settings");
        return Ok(cached.clone());
    }
    let setup = inner.setup.as_ref().ok_or(SettingsError::NotConfigured)?;
    let layers = read_layers(setup)?;
    let config = Arc::new(validate_layers(&setup.schema, &layers)?);
    info!(
        "settings loaded (layers={}, namespaces={})",
        layers.len(),
        config.namespaces().count()
    );
    inner.cached = Some(config.clone());
    Ok(config)
}

/// Read every non-CLI layer, lowest precedence first.
fn read_layers(setup: &Setup) -> Result<Vec<LoadedLayer>, SettingsError> {
    let options = &setup.options;
    let vars = options.environment.snapshot();

    let project_root = match &options.project_root {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(|err| SettingsError::File {
            path: PathBuf::from("."),
            reason: err.to_string(),
        })?,
    };
    let project_root = utils::normalize_path(&project_root)?;
    debug!("resolved project root: {}", project_root.display());
    let user_path = options
        .user_config_path
        .clone()
        .or_else(|| layer_io::default_user_settings_path(&vars));

    let mut layers = vec![layer_io::default_layer(&setup.schema)];
    let mut seen_paths = HashSet::new();
    for (layer, path) in [
        (Layer::Project, Some(layer_io::project_settings_path(&project_root))),
        (Layer::User, user_path),
    ] {
        let Some(path) = path else {
            debug!("no settings path for layer (source={:?})", layer);
            continue;
        };
        if !seen_paths.insert(utils::unique_path(&path)) {
            debug!(
                "skipping duplicate layer (source={:?}, path={})",
                layer,
                path.display()
            );
            continue;
        }
        if let Some(loaded) = layer_io::load_optional_layer(layer, &path)? {
            layers.push(loaded);
        }
    }

    let env_layer = env::decode_environment(&vars, &options.env_prefix, &setup.schema);
    debug!(
        "decoded environment layer (prefix={}, values={})",
        options.env_prefix,
        env_layer.origins.len()
    );
    layers.push(env_layer.into_layer());

    for layer in &mut layers {
        transforms::expand_variables(&mut layer.values, &vars);
    }
    Ok(layers)
}

fn validate_layers(
    schema: &Arc<Schema>,
    layers: &[LoadedLayer],
) -> Result<UnifiedConfig, SettingsError> {
    let merged = merge_layers(layers.iter().map(|layer| &layer.values));
    validate::validate_unified(schema, &merged).map_err(|err| {
        let source = resolve::source_layer(layers, &err.path);
        SettingsError::from(err.with_layer(source))
    })
}
