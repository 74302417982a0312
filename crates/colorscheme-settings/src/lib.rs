//! Layered settings resolution for color-scheme.
//!
//! Subsystems register a [`Schema`] per namespace with a [`SchemaRegistry`].
//! A [`SettingsContext`] configured with the composed schema reads defaults,
//! the project and user `settings.toml` files, and `COLORSCHEME_*`
//! environment variables, deep-merges them, and validates the result into a
//! cached [`UnifiedConfig`]. Command-line [`Overrides`] are applied on top
//! without touching the cache.

mod error;
mod loader;
mod registry;
mod schema;
mod value;

/// Public error types returned by registration, loading, and overrides.
pub use error::{SettingsError, ValidationError};
/// Resolution pipeline, layers, merge, and override types.
pub use loader::{
    DEFAULT_ENV_PREFIX, Environment, Layer, Overrides, PipelineState, ResolvedConfig,
    ResolvedValue, SettingsContext, SettingsOptions, ShadowedValue, TEMPLATES_DIR_VARIABLE,
    apply_overrides, deep_merge, merge_layers,
};
pub use registry::SchemaRegistry;
/// Schema descriptors.
pub use schema::{Field, FieldKind, Schema, SchemaBuilder};
pub use value::{Setting, UnifiedConfig};

/// Neutral value representation shared by every layer.
pub use toml::{Table, Value};
