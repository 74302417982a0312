//! Per-value source attribution.

use super::{DEFAULT_SOURCE_DETAIL, Layer, LoadedLayer};
use crate::{Setting, UnifiedConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use toml::{Table, Value};

/// A resolved leaf value together with the layer that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedValue {
    /// The validated value.
    pub value: Setting,
    /// Highest-precedence layer that supplied the path.
    pub source: Layer,
    /// File path, variable name, or override text for that layer.
    pub source_detail: String,
    /// Lower layers that also supplied the path, highest first.
    pub overridden: Vec<ShadowedValue>,
}

/// A value supplied by a layer but hidden by a higher one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowedValue {
    pub layer: Layer,
    pub source_detail: String,
    /// Raw value as read, before coercion.
    pub value: Value,
}

/// Every leaf of a resolved configuration keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, ResolvedValue>,
}

impl ResolvedConfig {
    pub fn get(&self, path: &str) -> Option<&ResolvedValue> {
        self.entries.get(path)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedValue)> {
        self.entries
            .iter()
            .map(|(path, value)| (path.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose winning value came from `layer`.
    pub fn from_layer(&self, layer: Layer) -> impl Iterator<Item = (&str, &ResolvedValue)> {
        self.iter().filter(move |(_, value)| value.source == layer)
    }

    /// Rebuild the nested mapping of winning values. Tables with no leaves
    /// do not appear.
    pub fn to_table(&self) -> Table {
        let mut root = Table::new();
        'entries: for (path, resolved) in &self.entries {
            let mut segments: Vec<&str> = path.split('.').collect();
            let Some(leaf) = segments.pop() else {
                continue;
            };
            let mut table = &mut root;
            for segment in segments {
                let slot = table
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Table(Table::new()));
                let Value::Table(next) = slot else {
                    continue 'entries;
                };
                table = next;
            }
            table.insert(leaf.to_string(), resolved.value.to_value());
        }
        root
    }
}

/// Attribute every leaf of `config` to the layers it was read from.
///
/// `layers` must be ordered lowest precedence first. Leaves no layer supplied
/// (nested defaults filled in during validation) are reported as defaults.
pub(crate) fn attribute(config: &UnifiedConfig, layers: &[LoadedLayer]) -> ResolvedConfig {
    let mut entries = BTreeMap::new();
    for (path, setting) in config.leaves() {
        let mut suppliers = layers
            .iter()
            .rev()
            .filter_map(|layer| lookup_path(&layer.values, &path).map(|raw| (layer, raw)));
        let (source, source_detail) = match suppliers.next() {
            Some((layer, _)) => (layer.layer, layer.detail(&path)),
            None => (Layer::Default, DEFAULT_SOURCE_DETAIL.to_string()),
        };
        let overridden = suppliers
            .map(|(layer, raw)| ShadowedValue {
                layer: layer.layer,
                source_detail: layer.detail(&path),
                value: raw.clone(),
            })
            .collect();
        entries.insert(
            path,
            ResolvedValue {
                value: setting.clone(),
                source,
                source_detail,
                overridden,
            },
        );
    }
    ResolvedConfig { entries }
}

/// Highest layer that supplied `path`, if any.
pub(crate) fn source_layer(layers: &[LoadedLayer], path: &str) -> Option<Layer> {
    layers
        .iter()
        .rev()
        .find(|layer| contains_path(&layer.values, path))
        .map(|layer| layer.layer)
}

/// Whether `table` holds a value at `path`. List indices (`formats[1]`)
/// resolve to the list itself.
pub(crate) fn contains_path(table: &Table, path: &str) -> bool {
    lookup_path(table, path).is_some()
}

fn lookup_path<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut segments = path
        .split('.')
        .map(|segment| segment.split_once('[').map_or(segment, |(name, _)| name));
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}
