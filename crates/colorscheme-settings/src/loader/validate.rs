//! Generic schema validation over merged settings tables.

use super::utils::{join_path, render_value};
use crate::schema::FieldKind;
use crate::{Schema, Setting, UnifiedConfig, ValidationError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use toml::{Table, Value};

/// Schema validation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchemaMode {
    /// Missing required fields are tolerated (defaults self-check).
    Partial,
    /// Full validation for the effective config.
    Full,
}

/// Validate a fully merged tree against the unified schema.
pub(crate) fn validate_unified(
    schema: &Arc<Schema>,
    merged: &Table,
) -> Result<UnifiedConfig, ValidationError> {
    let values = validate_table(schema, merged, "", SchemaMode::Full)?;
    Ok(UnifiedConfig::new(schema.clone(), values))
}

/// Validate one table, filling declared defaults for absent fields.
pub(crate) fn validate_table(
    schema: &Schema,
    table: &Table,
    prefix: &str,
    mode: SchemaMode,
) -> Result<BTreeMap<String, Setting>, ValidationError> {
    for (key, value) in table {
        if schema.field(key).is_none() {
            let constraint = if prefix.is_empty() {
                "unknown namespace"
            } else {
                "unknown key"
            };
            return Err(ValidationError::new(
                &join_path(prefix, key),
                render_value(value),
                constraint,
            ));
        }
    }

    let mut values = BTreeMap::new();
    for (name, field) in schema.fields() {
        let path = join_path(prefix, name);
        match table.get(name).or(field.default_value()) {
            Some(value) => {
                let setting = validate_field(field.kind(), value, &path, mode)?;
                values.insert(name.to_string(), setting);
            }
            None => match field.kind() {
                FieldKind::Table(nested) => {
                    let nested = validate_table(nested, &Table::new(), &path, mode)?;
                    values.insert(name.to_string(), Setting::Table(nested));
                }
                _ if field.is_required() && mode == SchemaMode::Full => {
                    return Err(ValidationError::new(
                        &path,
                        "<missing>",
                        "missing required field",
                    ));
                }
                _ => {}
            },
        }
    }
    Ok(values)
}

fn validate_field(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    mode: SchemaMode,
) -> Result<Setting, ValidationError> {
    let invalid = |reason: String| ValidationError::new(path, render_value(value), reason);
    match kind {
        FieldKind::Table(schema) => {
            let Value::Table(table) = value else {
                return Err(invalid(format!("expected {kind}")));
            };
            Ok(Setting::Table(validate_table(schema, table, path, mode)?))
        }
        FieldKind::List(element) => {
            let items = match value {
                Value::Array(items) => items.clone(),
                Value::String(_) => match kind.coerce(value).map_err(invalid)? {
                    Value::Array(items) => items,
                    _ => return Err(invalid(format!("expected {kind}"))),
                },
                _ => return Err(invalid(format!("expected {kind}"))),
            };
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| validate_field(element, item, &format!("{path}[{idx}]"), mode))
                .collect::<Result<Vec<_>, _>>()
                .map(Setting::List)
        }
        _ => {
            let coerced = kind.coerce(value).map_err(invalid)?;
            kind.check(&coerced).map_err(invalid)?;
            scalar_setting(kind, coerced).ok_or_else(|| invalid(format!("expected {kind}")))
        }
    }
}

fn scalar_setting(kind: &FieldKind, value: Value) -> Option<Setting> {
    match (kind, value) {
        (_, Value::Boolean(flag)) => Some(Setting::Bool(flag)),
        (_, Value::Integer(number)) => Some(Setting::Integer(number)),
        (_, Value::Float(number)) => Some(Setting::Float(number)),
        (FieldKind::Path, Value::String(text)) => Some(Setting::Path(PathBuf::from(text))),
        (_, Value::String(text)) => Some(Setting::String(text)),
        _ => None,
    }
}
