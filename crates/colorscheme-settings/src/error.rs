//! Error types for settings registration, loading, validation, and overrides.

use crate::Layer;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the settings engine.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A settings file exists but could not be read or parsed.
    #[error("failed to load {}: {reason}", .path.display())]
    File { path: PathBuf, reason: String },
    /// The merged configuration violates the unified schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An override was malformed, targeted an unknown key, or failed coercion.
    #[error("invalid override '{key}': {reason}")]
    Override { key: String, reason: String },
    /// Duplicate registration or lookup of an unknown namespace.
    #[error("registry error for namespace '{namespace}': {reason}")]
    Registry { namespace: String, reason: String },
    /// `load_config` was called before `configure`.
    #[error("settings system not configured; call configure() first")]
    NotConfigured,
    /// A schema descriptor could not be built.
    #[error("invalid schema at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },
    /// Decoding a namespace into a caller-provided type failed.
    #[error("failed to decode settings: {0}")]
    DecodeFailed(#[from] serde_json::Error),
}

/// A single schema constraint violation.
#[derive(Debug, Clone, Error)]
#[error(
    "validation failed for '{namespace}' namespace{}: {path} = {value}: {constraint}",
    layer_note(.layer)
)]
pub struct ValidationError {
    /// Namespace owning the offending field.
    pub namespace: String,
    /// Dotted path of the offending field.
    pub path: String,
    /// Rendered offending value (`<missing>` for absent required fields).
    pub value: String,
    /// Human-readable description of the violated constraint.
    pub constraint: String,
    /// Layer that supplied the offending value, when known.
    pub layer: Option<Layer>,
}

impl ValidationError {
    pub(crate) fn new(
        path: &str,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        let namespace = path.split('.').next().unwrap_or_default().to_string();
        Self {
            namespace,
            path: path.to_string(),
            value: value.into(),
            constraint: constraint.into(),
            layer: None,
        }
    }

    pub(crate) fn with_layer(mut self, layer: Option<Layer>) -> Self {
        self.layer = layer;
        self
    }
}

fn layer_note(layer: &Option<Layer>) -> String {
    match layer {
        Some(layer) => format!(" (from {} layer)", layer.label()),
        None => String::new(),
    }
}

impl SettingsError {
    pub(crate) fn override_error(key: &str, reason: impl Into<String>) -> Self {
        Self::Override {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn registry(namespace: &str, reason: impl Into<String>) -> Self {
        Self::Registry {
            namespace: namespace.to_string(),
            reason: reason.into(),
        }
    }

    /// Return the validation details when this is a validation failure.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
