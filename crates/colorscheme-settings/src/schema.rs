//! Schema descriptors for settings namespaces.
//!
//! A [`Schema`] is an immutable description of one settings table: field
//! names, kinds, defaults, and constraints. Subsystems build one per
//! namespace and hand it to the [`SchemaRegistry`](crate::SchemaRegistry);
//! the registry composes them into the unified schema that validation walks.

use crate::SettingsError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use toml::{Table, Value};

/// Structural description of a settings table.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

/// A single field in a schema.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    default: Option<Value>,
    required: bool,
    description: Option<String>,
}

/// Declared type and constraints for a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Bool,
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    String {
        pattern: Option<Regex>,
    },
    Enum {
        variants: Vec<String>,
        case_insensitive: bool,
    },
    Path,
    List(Box<FieldKind>),
    Table(Arc<Schema>),
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a direct field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of direct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve a nested field by path segments, descending through tables.
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Field> {
        let (first, rest) = segments.split_first()?;
        let field = self.fields.get(first.as_ref())?;
        if rest.is_empty() {
            return Some(field);
        }
        match &field.kind {
            FieldKind::Table(schema) => schema.lookup(rest),
            _ => None,
        }
    }

    /// Nested mapping of every declared default.
    ///
    /// Table fields always appear (possibly empty) so the result mirrors the
    /// schema's shape.
    pub fn defaults(&self) -> Table {
        let mut table = Table::new();
        for (name, field) in &self.fields {
            match (&field.default, &field.kind) {
                (Some(value), _) => {
                    table.insert(name.clone(), value.clone());
                }
                (None, FieldKind::Table(schema)) => {
                    table.insert(name.clone(), Value::Table(schema.defaults()));
                }
                (None, _) => {}
            }
        }
        table
    }

    pub(crate) fn from_fields(fields: BTreeMap<String, Field>) -> Self {
        Self { fields }
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, Field)>,
}

impl SchemaBuilder {
    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Add a nested table field described by another schema.
    pub fn table(self, name: impl Into<String>, schema: Schema) -> Self {
        self.field(name, Field::table(schema))
    }

    /// Finalize the schema, rejecting duplicate or malformed field names and
    /// defaults whose type does not match their field.
    pub fn build(self) -> Result<Schema, SettingsError> {
        let mut fields = BTreeMap::new();
        for (name, field) in self.fields {
            if name.is_empty() || name.contains('.') || name != name.to_lowercase() {
                return Err(SettingsError::InvalidSchema {
                    path: name,
                    reason: "field names must be non-empty, lower-case, and dot-free".to_string(),
                });
            }
            if let Some(default) = &field.default {
                if let Err(reason) = field.kind.coerce(default) {
                    return Err(SettingsError::InvalidSchema {
                        path: name,
                        reason: format!("default does not match field type: {reason}"),
                    });
                }
            }
            if fields.insert(name.clone(), field).is_some() {
                return Err(SettingsError::InvalidSchema {
                    path: name,
                    reason: "duplicate field".to_string(),
                });
            }
        }
        Ok(Schema { fields })
    }
}

impl Field {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
            required: false,
            description: None,
        }
    }

    pub fn bool() -> Self {
        Self::of(FieldKind::Bool)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer {
            min: None,
            max: None,
        })
    }

    /// Integer constrained to the inclusive range `[min, max]`.
    pub fn integer_in(min: i64, max: i64) -> Self {
        Self::of(FieldKind::Integer {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn float() -> Self {
        Self::of(FieldKind::Float {
            min: None,
            max: None,
        })
    }

    /// Float constrained to the inclusive range `[min, max]`.
    pub fn float_in(min: f64, max: f64) -> Self {
        Self::of(FieldKind::Float {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String { pattern: None })
    }

    /// String that must match the given regular expression.
    pub fn string_matching(pattern: &str) -> Result<Self, SettingsError> {
        let regex = Regex::new(pattern).map_err(|err| SettingsError::InvalidSchema {
            path: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::of(FieldKind::String {
            pattern: Some(regex),
        }))
    }

    /// String restricted to a fixed set of values.
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(FieldKind::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        })
    }

    pub fn path() -> Self {
        Self::of(FieldKind::Path)
    }

    /// Sequence whose elements follow `element`'s kind and constraints.
    pub fn list(element: Field) -> Self {
        Self::of(FieldKind::List(Box::new(element.kind)))
    }

    pub fn table(schema: Schema) -> Self {
        Self::shared_table(Arc::new(schema))
    }

    pub(crate) fn shared_table(schema: Arc<Schema>) -> Self {
        Self::of(FieldKind::Table(schema))
    }

    /// Declared default used by the defaults layer.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Fail validation when no layer supplies a value and there is no default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accept enumeration members in any letter case, normalised to the
    /// declared spelling. No effect on other kinds.
    pub fn case_insensitive(mut self) -> Self {
        if let FieldKind::Enum {
            case_insensitive, ..
        } = &mut self.kind
        {
            *case_insensitive = true;
        }
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl FieldKind {
    /// Convert a raw value into this kind's canonical representation.
    ///
    /// Strings are parsed into booleans, numbers, and lists, which is how
    /// environment values and textual overrides acquire their types. Nested
    /// tables are returned unchanged; their fields are walked by validation.
    pub(crate) fn coerce(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (FieldKind::Bool, Value::Boolean(_)) => Ok(value.clone()),
            (FieldKind::Bool, Value::String(raw)) => parse_bool(raw)
                .map(Value::Boolean)
                .ok_or_else(|| "expected bool".to_string()),
            (FieldKind::Integer { .. }, Value::Integer(_)) => Ok(value.clone()),
            (FieldKind::Integer { .. }, Value::Float(number))
                if number.fract() == 0.0
                    && (i64::MIN as f64..i64::MAX as f64).contains(number) =>
            {
                Ok(Value::Integer(*number as i64))
            }
            (FieldKind::Integer { .. }, Value::String(raw)) => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| "expected integer".to_string()),
            (FieldKind::Float { .. }, Value::Float(number)) if number.is_finite() => {
                Ok(value.clone())
            }
            (FieldKind::Float { .. }, Value::Integer(number)) => Ok(Value::Float(*number as f64)),
            (FieldKind::Float { .. }, Value::String(raw)) => match raw.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(Value::Float(number)),
                _ => Err("expected number".to_string()),
            },
            (FieldKind::String { .. }, Value::String(_)) => Ok(value.clone()),
            (FieldKind::String { .. }, Value::Datetime(datetime)) => {
                Ok(Value::String(datetime.to_string()))
            }
            (FieldKind::Path, Value::String(_)) => Ok(value.clone()),
            (
                FieldKind::Enum {
                    variants,
                    case_insensitive,
                },
                Value::String(raw),
            ) => {
                let raw = raw.trim();
                variants
                    .iter()
                    .find(|variant| {
                        if *case_insensitive {
                            variant.eq_ignore_ascii_case(raw)
                        } else {
                            variant.as_str() == raw
                        }
                    })
                    .map(|variant| Value::String(variant.clone()))
                    .ok_or_else(|| format!("expected one of: {}", variants.join(", ")))
            }
            (FieldKind::List(element), Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    element
                        .coerce(item)
                        .map_err(|reason| format!("[{idx}]: {reason}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (FieldKind::List(_), Value::String(raw)) => {
                let parsed = parse_list(raw)?;
                self.coerce(&parsed)
            }
            (FieldKind::Table(_), Value::Table(_)) => Ok(value.clone()),
            (kind, _) => Err(format!("expected {kind}")),
        }
    }

    /// Check range, pattern, and element constraints on an already coerced
    /// value.
    pub(crate) fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (FieldKind::Integer { min, max }, Value::Integer(number)) => {
                check_bounds(*number, *min, *max, |bound| bound.to_string())
            }
            (FieldKind::Float { min, max }, Value::Float(number)) => {
                check_bounds(*number, *min, *max, |bound| format!("{bound:?}"))
            }
            (
                FieldKind::String {
                    pattern: Some(pattern),
                },
                Value::String(text),
            ) => {
                if pattern.is_match(text) {
                    Ok(())
                } else {
                    Err(format!("must match pattern `{}`", pattern.as_str()))
                }
            }
            (FieldKind::List(element), Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    element
                        .check(item)
                        .map_err(|reason| format!("[{idx}]: {reason}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, FieldKind::Table(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::Integer { .. } => f.write_str("integer"),
            FieldKind::Float { .. } => f.write_str("float"),
            FieldKind::String { .. } => f.write_str("string"),
            FieldKind::Enum { variants, .. } => write!(f, "enum[{}]", variants.join("|")),
            FieldKind::Path => f.write_str("path"),
            FieldKind::List(element) => write!(f, "list<{element}>"),
            FieldKind::Table(_) => f.write_str("table"),
        }
    }
}

fn check_bounds<T: PartialOrd + Copy>(
    value: T,
    min: Option<T>,
    max: Option<T>,
    render: impl Fn(T) -> String,
) -> Result<(), String> {
    if let Some(min) = min {
        if value < min {
            return Err(format!("must be >= {}", render(min)));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("must be <= {}", render(max)));
        }
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a textual list: a TOML inline array (`["a", "b"]`) or a
/// comma-separated list (`a,b`). An empty string is an empty list.
fn parse_list(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        let document = format!("value = {trimmed}");
        let mut table: Table = toml::from_str(&document)
            .map_err(|err| format!("invalid array literal: {}", err.message()))?;
        return table
            .remove("value")
            .ok_or_else(|| "invalid array literal".to_string());
    }
    if trimmed.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Array(
        trimmed
            .split(',')
            .map(|item| Value::String(item.trim().to_string()))
            .collect(),
    ))
}
