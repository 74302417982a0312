//! Normalisation passes applied to layer tables before merging.

use std::collections::BTreeMap;
use toml::{Table, Value};

/// Lower-case every key, recursively. Later duplicates overwrite earlier ones
/// (`Level` and `level` in the same table collapse into one key).
pub(crate) fn lowercase_keys(table: Table) -> Table {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Table(nested) => Value::Table(lowercase_keys(nested)),
                other => other,
            };
            (key.to_lowercase(), value)
        })
        .collect()
}

/// Expand `$NAME` and `${NAME}` references inside string values, including
/// strings nested in arrays. Unset variables are left verbatim.
pub(crate) fn expand_variables(table: &mut Table, env: &BTreeMap<String, String>) {
    for (_, value) in table.iter_mut() {
        expand_value(value, env);
    }
}

fn expand_value(value: &mut Value, env: &BTreeMap<String, String>) {
    match value {
        Value::String(text) if text.contains('$') => *text = expand_str(text, env),
        Value::Array(items) => items.iter_mut().for_each(|item| expand_value(item, env)),
        Value::Table(table) => expand_variables(table, env),
        _ => {}
    }
}

pub(crate) fn expand_str(text: &str, env: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .char_indices()
                .find(|(idx, ch)| !is_name_char(*idx, *ch))
                .map_or(after.len(), |(idx, _)| idx);
            (&after[..end], end)
        };

        match env.get(name).filter(|_| !name.is_empty()) {
            Some(replacement) => out.push_str(replacement),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

fn is_name_char(idx: usize, ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic() || (idx > 0 && ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env() -> BTreeMap<String, String> {
        [("HOME", "/home/me"), ("XDG_DATA", "/data")]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Both `$NAME` and `${NAME}` expand.
    #[test]
    fn expands_plain_and_braced_references() {
        assert_eq!(expand_str("$HOME/out", &env()), "/home/me/out");
        assert_eq!(expand_str("${XDG_DATA}x", &env()), "/datax");
        assert_eq!(expand_str("a$HOME$XDG_DATA", &env()), "a/home/me/data");
    }

    /// Unknown and malformed references stay verbatim.
    #[test]
    fn leaves_unknown_and_malformed_references() {
        assert_eq!(expand_str("$NOPE/x", &env()), "$NOPE/x");
        assert_eq!(expand_str("${NOPE}", &env()), "${NOPE}");
        assert_eq!(expand_str("${HOME", &env()), "${HOME");
        assert_eq!(expand_str("cost: $5", &env()), "cost: $5");
        assert_eq!(expand_str("trailing $", &env()), "trailing $");
    }

    /// Expansion reaches nested tables and arrays.
    #[test]
    fn walks_nested_tables_and_arrays() {
        let mut table: Table = toml::from_str(
            r#"
            [output]
            directory = "$HOME/out"
            formats = ["${XDG_DATA}", "json"]
            count = 3
            "#,
        )
        .expect("toml");
        expand_variables(&mut table, &env());
        assert_eq!(table["output"]["directory"].as_str(), Some("/home/me/out"));
        assert_eq!(table["output"]["formats"][0].as_str(), Some("/data"));
        assert_eq!(table["output"]["count"].as_integer(), Some(3));
    }

    /// Lower-casing applies to nested keys.
    #[test]
    fn lowercases_nested_keys() {
        let table: Table = toml::from_str("[Logging]\nLevel = \"debug\"\n").expect("toml");
        let table = lowercase_keys(table);
        assert_eq!(table["logging"]["level"].as_str(), Some("debug"));
    }
}
