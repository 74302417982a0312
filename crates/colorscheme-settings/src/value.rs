//! Validated settings values and the unified configuration object.

use crate::{Schema, SettingsError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml::{Table, Value};

/// A typed value produced by schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Setting {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Path(PathBuf),
    List(Vec<Setting>),
    Table(BTreeMap<String, Setting>),
}

impl Setting {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Setting::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Setting::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Setting::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// String or enumeration value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Setting::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Setting::Path(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Setting]> {
        match self {
            Setting::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, Setting>> {
        match self {
            Setting::Table(entries) => Some(entries),
            _ => None,
        }
    }

    /// Convert back into the neutral TOML representation.
    pub fn to_value(&self) -> Value {
        match self {
            Setting::Bool(value) => Value::Boolean(*value),
            Setting::Integer(value) => Value::Integer(*value),
            Setting::Float(value) => Value::Float(*value),
            Setting::String(value) => Value::String(value.clone()),
            Setting::Path(value) => Value::String(value.to_string_lossy().into_owned()),
            Setting::List(items) => Value::Array(items.iter().map(Setting::to_value).collect()),
            Setting::Table(entries) => Value::Table(table_from_settings(entries)),
        }
    }
}

pub(crate) fn table_from_settings(entries: &BTreeMap<String, Setting>) -> Table {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), value.to_value()))
        .collect()
}

/// The validated composition of every registered namespace.
///
/// Read-only once built. Applying overrides produces a new object; the
/// pipeline shares instances as `Arc<UnifiedConfig>` so identity can be
/// compared with `Arc::ptr_eq`.
#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    schema: Arc<Schema>,
    values: BTreeMap<String, Setting>,
}

impl UnifiedConfig {
    pub(crate) fn new(schema: Arc<Schema>, values: BTreeMap<String, Setting>) -> Self {
        Self { schema, values }
    }

    /// The unified schema this object was validated against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Look up a value by dotted path (e.g. `generation.backend`).
    pub fn get(&self, path: &str) -> Option<&Setting> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// The validated subtree for one namespace.
    pub fn namespace(&self, namespace: &str) -> Option<&BTreeMap<String, Setting>> {
        self.values.get(namespace).and_then(Setting::as_table)
    }

    /// Namespaces present in this object, in name order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Every leaf value keyed by dotted path. Lists count as leaves.
    pub fn leaves(&self) -> Vec<(String, &Setting)> {
        let mut out = Vec::new();
        for (key, value) in &self.values {
            collect_leaves(key.clone(), value, &mut out);
        }
        out
    }

    /// Serialize back to a nested mapping.
    pub fn to_table(&self) -> Table {
        table_from_settings(&self.values)
    }

    /// Decode one namespace into a subsystem's own settings type.
    pub fn extract<T: DeserializeOwned>(&self, namespace: &str) -> Result<T, SettingsError> {
        let subtree = self
            .values
            .get(namespace)
            .ok_or_else(|| SettingsError::registry(namespace, "namespace not registered"))?;
        let json = serde_json::to_value(subtree)?;
        Ok(serde_json::from_value(json)?)
    }
}

fn collect_leaves<'a>(path: String, value: &'a Setting, out: &mut Vec<(String, &'a Setting)>) {
    match value {
        Setting::Table(entries) => {
            for (key, child) in entries {
                collect_leaves(format!("{path}.{key}"), child, out);
            }
        }
        _ => out.push((path, value)),
    }
}
