//! Registry of per-namespace schemas.

use crate::loader::validate::{self, SchemaMode};
use crate::{Field, Schema, SettingsError};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory mapping of namespace to schema.
///
/// Each subsystem registers exactly one namespace at startup. The registry
/// knows nothing about individual schemas beyond composing them into the
/// unified schema the resolution pipeline validates against.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace schema.
    ///
    /// Fails if the namespace is already taken or if the schema's declared
    /// defaults violate its own constraints.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        schema: Schema,
    ) -> Result<(), SettingsError> {
        let namespace = namespace.into();
        if namespace.is_empty() || namespace.contains('.') {
            return Err(SettingsError::registry(
                &namespace,
                "namespace must be non-empty and dot-free",
            ));
        }
        if self.entries.contains_key(&namespace) {
            return Err(SettingsError::registry(
                &namespace,
                "namespace already registered",
            ));
        }
        validate::validate_table(&schema, &schema.defaults(), &namespace, SchemaMode::Partial)
            .map_err(|err| {
                SettingsError::registry(&namespace, format!("invalid defaults: {err}"))
            })?;
        debug!(
            "registering settings schema (namespace={}, fields={})",
            namespace,
            schema.len()
        );
        self.entries.insert(namespace, Arc::new(schema));
        Ok(())
    }

    /// Fetch a registered schema.
    pub fn get(&self, namespace: &str) -> Result<Arc<Schema>, SettingsError> {
        self.entries
            .get(namespace)
            .cloned()
            .ok_or_else(|| SettingsError::registry(namespace, "namespace not registered"))
    }

    /// Registered namespace names, in name order.
    pub fn all_namespaces(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.entries.contains_key(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compose every registered namespace into one schema whose fields are
    /// exactly the namespaces.
    pub fn unified_schema(&self) -> Schema {
        let fields = self
            .entries
            .iter()
            .map(|(namespace, schema)| (namespace.clone(), Field::shared_table(schema.clone())))
            .collect();
        Schema::from_fields(fields)
    }
}
