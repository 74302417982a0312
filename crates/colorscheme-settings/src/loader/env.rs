//! Environment layer: decodes prefixed variables into nested settings paths.
//!
//! `COLORSCHEME_OUTPUT__DIRECTORY=/tmp/x` becomes `output.directory`. The
//! double underscore separates path segments; a single underscore stays part
//! of the key (`COLORSCHEME_GENERATION__SATURATION_BOOST` is
//! `generation.saturation_boost`). A small table of legacy variable names is
//! recognised verbatim outside that convention.

use super::utils::join_path;
use super::{Layer, LoadedLayer};
use crate::Schema;
use log::{debug, warn};
use std::collections::BTreeMap;
use toml::{Table, Value};

/// Default prefix for settings variables.
pub const DEFAULT_ENV_PREFIX: &str = "COLORSCHEME_";
/// Separator between nested path segments.
const NESTING_DELIMITER: &str = "__";
/// Template-directory override predating the prefix convention.
pub const TEMPLATES_DIR_VARIABLE: &str = "COLOR_SCHEME_TEMPLATES";
/// Variables mapped by exact name to a fixed settings path. Applied after the
/// prefixed variables, so they win when both name the same path.
const LEGACY_VARIABLES: &[(&str, &[&str])] =
    &[(TEMPLATES_DIR_VARIABLE, &["templates", "directory"])];

/// Where environment variables are read from.
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// The live process environment, read on every load.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(BTreeMap<String, String>),
}

impl Environment {
    /// Build a fixed environment from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Capture the variables visible right now. Non-UTF-8 entries are skipped.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        match self {
            Environment::Process => std::env::vars_os()
                .filter_map(|(key, value)| {
                    Some((key.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
            Environment::Fixed(vars) => vars.clone(),
        }
    }
}

/// Decoded environment values plus the variable that supplied each path.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvLayer {
    pub(crate) values: Table,
    pub(crate) origins: BTreeMap<String, String>,
}

/// Decode every variable carrying `prefix`, then the legacy names.
///
/// Only names that decode to a leaf setting in `schema` are kept; the
/// process environment is shared with unrelated tools, so anything else is
/// logged and skipped before it can claim a slot in the layer. Values stay
/// raw strings; the schema gives them types during validation.
pub(crate) fn decode_environment(
    vars: &BTreeMap<String, String>,
    prefix: &str,
    schema: &Schema,
) -> EnvLayer {
    let mut layer = EnvLayer::default();
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let segments: Vec<String> = rest
            .split(NESTING_DELIMITER)
            .map(str::to_lowercase)
            .collect();
        if segments
            .iter()
            .any(|segment| segment.is_empty() || segment.contains('.'))
        {
            warn!("ignoring malformed settings variable (name={name})");
            continue;
        }
        if !is_leaf_setting(schema, &segments) {
            warn!(
                "ignoring settings variable with no matching setting (name={name}, path={})",
                segments.join(".")
            );
            continue;
        }
        layer.insert(&segments, value, name);
    }

    for &(name, path) in LEGACY_VARIABLES {
        let Some(value) = vars.get(name) else {
            continue;
        };
        if !is_leaf_setting(schema, path) {
            debug!("legacy settings variable has no matching setting (name={name})");
            continue;
        }
        debug!("applying legacy settings variable (name={name})");
        layer.insert(path, value, name);
    }
    layer
}

fn is_leaf_setting<S: AsRef<str>>(schema: &Schema, segments: &[S]) -> bool {
    schema
        .lookup(segments)
        .is_some_and(|field| !field.kind().is_table())
}

impl EnvLayer {
    /// Known leaf paths never nest inside one another, so inserts cannot
    /// collide structurally; a repeated path overwrites the earlier value.
    fn insert<S: AsRef<str>>(&mut self, segments: &[S], value: &str, name: &str) {
        let Some((leaf, parents)) = segments.split_last() else {
            return;
        };
        let mut table = &mut self.values;
        for segment in parents {
            let slot = table
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            let Value::Table(next) = slot else {
                warn!("ignoring settings variable that conflicts with another (name={name})");
                return;
            };
            table = next;
        }
        table.insert(leaf.as_ref().to_string(), Value::String(value.to_string()));
        let dotted = segments
            .iter()
            .fold(String::new(), |acc, segment| join_path(&acc, segment.as_ref()));
        self.origins.insert(dotted, name.to_string());
    }

    pub(crate) fn into_layer(self) -> LoadedLayer {
        LoadedLayer {
            layer: Layer::Env,
            path: None,
            values: self.values,
            origins: self.origins,
        }
    }
}
