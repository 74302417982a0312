//! Deep merge of layered settings tables.
//!
//! Tables recurse; every other value, sequences included, is replaced
//! wholesale by the higher-precedence side. A project's
//! `formats = ["json"]` therefore hides the defaults' longer list instead of
//! extending it.

use toml::{Table, Value};

/// Merge `overlay` into `base` in place.
pub(crate) fn merge_into(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        if let (Some(Value::Table(existing)), Value::Table(incoming)) = (base.get_mut(key), value) {
            merge_into(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Return a new table with `overlay` deep-merged over `base`.
pub fn deep_merge(base: &Table, overlay: &Table) -> Table {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}

/// Fold tables left to right, lowest precedence first.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Table>) -> Table {
    let mut merged = Table::new();
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Table {
        toml::from_str(text).expect("toml")
    }

    /// Lists replace, never concatenate.
    #[test]
    fn lists_replace_never_concatenate() {
        let merged = deep_merge(&parse("a = [1, 2, 3]"), &parse("a = [9]"));
        assert_eq!(merged, parse("a = [9]"));
    }

    /// A higher layer's list hides the lower one.
    #[test]
    fn higher_layer_formats_suppress_lower() {
        let base = parse(
            r#"
            [output]
            formats = ["json", "css", "yaml"]
            directory = "/out"
            "#,
        );
        let overlay = parse("[output]\nformats = [\"json\"]\n");
        assert_eq!(
            deep_merge(&base, &overlay),
            parse("[output]\nformats = [\"json\"]\ndirectory = \"/out\"\n")
        );
    }

    /// Tables merge key by key.
    #[test]
    fn tables_recurse_and_one_sided_keys_survive() {
        let base = parse(
            r#"
            [generation]
            backend = "pywal"
            saturation_boost = 1.0
            [logging]
            level = "INFO"
            "#,
        );
        let overlay = parse(
            r#"
            [generation]
            backend = "wallust"
            [templates]
            directory = "/t"
            "#,
        );
        let expected = parse(
            r#"
            [generation]
            backend = "wallust"
            saturation_boost = 1.0
            [logging]
            level = "INFO"
            [templates]
            directory = "/t"
            "#,
        );
        assert_eq!(deep_merge(&base, &overlay), expected);
    }

    /// Mismatched kinds are replaced outright.
    #[test]
    fn scalar_and_table_replace_each_other() {
        assert_eq!(
            deep_merge(&parse("a = { b = 1 }"), &parse("a = 2")),
            parse("a = 2")
        );
        assert_eq!(
            deep_merge(&parse("a = 2"), &parse("a = { b = 1 }")),
            parse("a = { b = 1 }")
        );
    }

    /// Inputs are left untouched.
    #[test]
    fn inputs_are_not_mutated() {
        let base = parse("a = 1");
        let overlay = parse("a = 2");
        let _ = deep_merge(&base, &overlay);
        assert_eq!(base, parse("a = 1"));
    }

    /// Folding is associative.
    #[test]
    fn fold_is_independent_of_grouping() {
        let l1 = parse("[g]\na = 1\nb = [1]\n");
        let l2 = parse("[g]\nb = [2, 3]\nc = 1\n");
        let l3 = parse("[g]\na = 3\n[h]\nx = true\n");
        let l4 = parse("[g]\nc = { deep = 1 }\n");
        let l5 = parse("[g]\nc = { deeper = 2 }\n");

        let left = merge_layers([&l1, &l2, &l3, &l4, &l5]);
        let right = deep_merge(
            &deep_merge(&l1, &l2),
            &deep_merge(&l3, &deep_merge(&l4, &l5)),
        );
        assert_eq!(left, right);
        assert_eq!(
            left,
            parse("[g]\na = 3\nb = [2, 3]\nc = { deep = 1, deeper = 2 }\n[h]\nx = true\n")
        );
    }
}
