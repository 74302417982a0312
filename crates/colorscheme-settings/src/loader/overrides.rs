//! Dotted-path overrides applied above every other layer.

use super::merge::deep_merge;
use super::validate::validate_unified;
use super::{Layer, LoadedLayer, resolve};
use crate::{Schema, SettingsError, UnifiedConfig};
use std::collections::BTreeMap;
use toml::{Table, Value};

/// An ordered set of `dotted.path = value` assignments.
///
/// Later entries for the same path win. Paths are checked against the schema
/// and values coerced to the declared type when the set is applied, not when
/// it is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    entries: Vec<OverrideEntry>,
}

#[derive(Debug, Clone, PartialEq)]
struct OverrideEntry {
    key: String,
    segments: Vec<String>,
    value: Value,
    detail: String,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` assignments as given on a command line. Whitespace
    /// around the key and the value is dropped; values stay text until
    /// applied.
    pub fn parse<I, S>(assignments: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let Some((key, value)) = assignment.split_once('=') else {
                return Err(SettingsError::override_error(
                    assignment,
                    "expected dotted.path=value",
                ));
            };
            overrides.push(
                key,
                Value::String(value.trim().to_string()),
                assignment.to_string(),
            )?;
        }
        Ok(overrides)
    }

    /// Build overrides from already-typed pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut overrides = Self::new();
        for (key, value) in pairs {
            overrides.set(key.as_ref(), value)?;
        }
        Ok(overrides)
    }

    /// Append one assignment.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, SettingsError> {
        let value = value.into();
        let detail = format!("{}={value}", key.trim());
        self.push(key, value, detail)?;
        Ok(self)
    }

    fn push(&mut self, key: &str, value: Value, detail: String) -> Result<(), SettingsError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(SettingsError::override_error(key, "empty setting path"));
        }
        let segments: Vec<String> = key
            .split('.')
            .map(|segment| segment.trim().to_lowercase())
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(SettingsError::override_error(key, "empty path segment"));
        }
        self.entries.push(OverrideEntry {
            key: key.to_string(),
            segments,
            value,
            detail,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Override keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Resolve every entry against `schema` into a nested, typed layer.
    pub(crate) fn to_layer(&self, schema: &Schema) -> Result<LoadedLayer, SettingsError> {
        let mut values = Table::new();
        let mut origins = BTreeMap::new();
        for entry in &self.entries {
            let field = schema
                .lookup(&entry.segments)
                .ok_or_else(|| SettingsError::override_error(&entry.key, "unknown setting"))?;
            if field.kind().is_table() {
                return Err(SettingsError::override_error(
                    &entry.key,
                    "cannot override a whole table; set one of its keys",
                ));
            }
            let coerced = field
                .kind()
                .coerce(&entry.value)
                .map_err(|reason| SettingsError::override_error(&entry.key, reason))?;
            insert_at(&mut values, &entry.segments, coerced);
            origins.insert(entry.segments.join("."), entry.detail.clone());
        }
        Ok(LoadedLayer {
            layer: Layer::Cli,
            path: None,
            values,
            origins,
        })
    }
}

fn insert_at(table: &mut Table, segments: &[String], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(leaf.clone(), value);
}

/// Produce a new configuration with `overrides` applied on top of `config`.
///
/// `config` is left untouched. The result is validated in full, so a value
/// that coerces but breaks a range or pattern constraint fails here with a
/// validation error attributed to the command-line layer.
pub fn apply_overrides(
    config: &UnifiedConfig,
    overrides: &Overrides,
) -> Result<UnifiedConfig, SettingsError> {
    let layer = overrides.to_layer(config.schema())?;
    let merged = deep_merge(&config.to_table(), &layer.values);
    validate_unified(config.schema(), &merged).map_err(|err| {
        let source = resolve::contains_path(&layer.values, &err.path).then_some(Layer::Cli);
        SettingsError::from(err.with_layer(source))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, Setting};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        let generation = Schema::builder()
            .field(
                "backend",
                Field::enumeration(["custom", "pywal", "wallust"]).default("pywal"),
            )
            .field("saturation_boost", Field::float_in(0.5, 2.0).default(1.0))
            .build()
            .expect("generation");
        let output = Schema::builder()
            .field("formats", Field::list(Field::string()).default(vec!["json", "css"]))
            .build()
            .expect("output");
        Arc::new(
            Schema::builder()
                .table("generation", generation)
                .table("output", output)
                .build()
                .expect("schema"),
        )
    }

    fn base() -> UnifiedConfig {
        let schema = schema();
        validate_unified(&schema, &schema.defaults()).expect("defaults")
    }

    /// Entries need `=` and a non-empty path.
    #[test]
    fn parse_requires_equals_and_segments() {
        assert!(Overrides::parse(["generation.backend"]).is_err());
        assert!(Overrides::parse(["=x"]).is_err());
        assert!(Overrides::parse(["generation..backend=x"]).is_err());
        let overrides = Overrides::parse(["generation.backend=a=b"]).expect("parse");
        assert_eq!(overrides.keys().collect::<Vec<_>>(), vec!["generation.backend"]);
    }

    /// Padding around `=` is ignored for every value kind.
    #[test]
    fn parse_trims_values_of_every_kind() {
        let overrides = Overrides::parse([
            "generation.backend= wallust ",
            "generation.saturation_boost = 1.2",
        ])
        .expect("parse");
        let merged = apply_overrides(&base(), &overrides).expect("apply");
        assert_eq!(
            merged.get("generation.backend").and_then(Setting::as_str),
            Some("wallust")
        );
        assert_eq!(
            merged.get("generation.saturation_boost"),
            Some(&Setting::Float(1.2))
        );
    }

    /// Overrides return a new config and leave the base alone.
    #[test]
    fn applies_typed_values_without_touching_base() {
        let base = base();
        let overrides = Overrides::parse([
            "generation.saturation_boost=1.5",
            "output.formats=json",
        ])
        .expect("parse");
        let merged = apply_overrides(&base, &overrides).expect("apply");

        assert_eq!(
            merged.get("generation.saturation_boost"),
            Some(&Setting::Float(1.5))
        );
        assert_eq!(
            merged.get("output.formats"),
            Some(&Setting::List(vec![Setting::String("json".into())]))
        );
        assert_eq!(
            base.get("generation.saturation_boost"),
            Some(&Setting::Float(1.0))
        );
    }

    /// The last entry for a path wins.
    #[test]
    fn later_entries_win() {
        let overrides = Overrides::from_pairs([
            ("generation.backend", "wallust"),
            ("generation.backend", "custom"),
        ])
        .expect("pairs");
        let merged = apply_overrides(&base(), &overrides).expect("apply");
        assert_eq!(
            merged.get("generation.backend").and_then(Setting::as_str),
            Some("custom")
        );
    }

    /// Unknown paths and table targets fail as override errors.
    #[test]
    fn unknown_path_and_table_target_are_override_errors() {
        let err = apply_overrides(
            &base(),
            &Overrides::parse(["generation.nope=1"]).expect("parse"),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Override { ref key, .. } if key == "generation.nope"));

        let err = apply_overrides(&base(), &Overrides::parse(["generation=1"]).expect("parse"))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Override { .. }));
    }

    /// Values that cannot be coerced fail as override errors.
    #[test]
    fn coercion_failure_is_an_override_error() {
        let err = apply_overrides(
            &base(),
            &Overrides::parse(["generation.saturation_boost=lots"]).expect("parse"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected number"));
    }

    /// Out-of-range values are reported against the command line.
    #[test]
    fn range_violation_is_attributed_to_cli() {
        let err = apply_overrides(
            &base(),
            &Overrides::from_pairs([("generation.saturation_boost", 3.0)]).expect("pairs"),
        )
        .unwrap_err();
        let validation = err.as_validation().expect("validation error");
        assert_eq!(validation.path, "generation.saturation_boost");
        assert_eq!(validation.layer, Some(Layer::Cli));
    }
}
