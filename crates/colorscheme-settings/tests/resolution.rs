//! End-to-end settings resolution tests through the public API.

use colorscheme_settings::{
    Environment, Field, Layer, Overrides, Schema, SchemaRegistry, SettingsContext, SettingsError,
    SettingsOptions, Setting, Table, apply_overrides, deep_merge, merge_layers,
};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

fn generation_schema() -> Schema {
    Schema::builder()
        .field(
            "backend",
            Field::enumeration(["custom", "pywal", "wallust"]).default("custom"),
        )
        .field("saturation_boost", Field::float_in(0.5, 2.0).default(1.0))
        .build()
        .expect("generation schema")
}

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register("generation", generation_schema())
        .expect("generation");
    registry
        .register(
            "output",
            Schema::builder()
                .field("directory", Field::path().default("out"))
                .field(
                    "formats",
                    Field::list(Field::string()).default(vec!["json", "css", "yaml"]),
                )
                .build()
                .expect("output schema"),
        )
        .expect("output");
    registry
        .register(
            "templates",
            Schema::builder()
                .field("directory", Field::path().default("templates"))
                .build()
                .expect("templates schema"),
        )
        .expect("templates");
    registry
}

fn options(temp: &TempDir, env: &[(&str, &str)]) -> SettingsOptions {
    SettingsOptions::new()
        .with_project_root(temp.path())
        .with_user_config_path(temp.path().join("user").join("settings.toml"))
        .with_environment(Environment::from_pairs(env.iter().copied()))
}

fn context(temp: &TempDir, env: &[(&str, &str)]) -> SettingsContext {
    let context = SettingsContext::new();
    context.configure_registry(&registry(), options(temp, env));
    context
}

fn parse(text: &str) -> Table {
    toml::from_str(text).expect("toml")
}

/// Lists from a higher layer replace lower lists outright.
#[test]
fn deep_merge_replaces_lists() {
    assert_eq!(
        deep_merge(&parse("a = [1, 2, 3]"), &parse("a = [9]")),
        parse("a = [9]")
    );
    assert_eq!(
        merge_layers([
            &parse("[output]\nformats = [\"json\", \"css\", \"yaml\"]\n"),
            &parse("[output]\nformats = [\"json\"]\n"),
        ]),
        parse("[output]\nformats = [\"json\"]\n")
    );
}

/// With every non-default layer empty the result equals the defaults.
#[test]
fn no_op_layers_resolve_to_defaults() {
    let temp = tempdir().expect("tempdir");
    let registry = registry();
    let config = context(&temp, &[]).load_config().expect("load");
    assert_eq!(config.to_table(), registry.unified_schema().defaults());
}

/// A key set by all five layers resolves to the command-line value; a key
/// set only by defaults and the environment resolves to the environment.
#[test]
fn precedence_across_all_five_layers() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join("settings.toml"),
        "[generation]\nsaturation_boost = 0.6\n",
    )
    .expect("project");
    let user = temp.path().join("user").join("settings.toml");
    fs::create_dir_all(user.parent().expect("parent")).expect("user dir");
    fs::write(&user, "[generation]\nsaturation_boost = 0.7\n").expect("user");

    let context = context(
        &temp,
        &[
            ("COLORSCHEME_GENERATION__SATURATION_BOOST", "0.8"),
            ("COLORSCHEME_OUTPUT__DIRECTORY", "/env/out"),
        ],
    );
    let overrides = Overrides::parse(["generation.saturation_boost=0.9"]).expect("parse");
    let config = context.get_config(Some(&overrides)).expect("config");
    assert_eq!(
        config.get("generation.saturation_boost"),
        Some(&Setting::Float(0.9))
    );
    assert_eq!(
        config.get("output.directory").and_then(Setting::as_path),
        Some(Path::new("/env/out"))
    );

    let resolved = context
        .resolve_with_sources(Some(&overrides))
        .expect("resolve");
    let boost = resolved.get("generation.saturation_boost").expect("boost");
    assert_eq!(boost.source, Layer::Cli);
    assert_eq!(
        boost
            .overridden
            .iter()
            .map(|shadowed| shadowed.layer)
            .collect::<Vec<_>>(),
        vec![Layer::Env, Layer::User, Layer::Project, Layer::Default]
    );
    assert_eq!(
        resolved.get("output.directory").map(|value| value.source),
        Some(Layer::Env)
    );
}

/// Repeated loads share one object; reload produces a new one.
#[test]
fn load_identity_and_reload() {
    let temp = tempdir().expect("tempdir");
    let context = context(&temp, &[]);
    let first = context.load_config().expect("first");
    let second = context.load_config().expect("second");
    assert!(Arc::ptr_eq(&first, &second));

    let reloaded = context.reload_config().expect("reload");
    assert!(!Arc::ptr_eq(&first, &reloaded));
}

/// Registering a namespace twice fails and keeps the first schema.
#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = registry();
    let err = registry
        .register("generation", generation_schema())
        .unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Registry { ref namespace, .. } if namespace == "generation"
    ));
    assert!(registry.get("generation").is_ok());
    assert!(matches!(
        registry.get("palette"),
        Err(SettingsError::Registry { .. })
    ));
}

/// String override values are coerced to the declared float type.
#[test]
fn override_strings_are_coerced() {
    let temp = tempdir().expect("tempdir");
    let context = context(&temp, &[]);
    let base = context.load_config().expect("load");

    let overrides =
        Overrides::from_pairs([("generation.saturation_boost", "1.3")]).expect("pairs");
    let config = apply_overrides(&base, &overrides).expect("apply");
    assert_eq!(
        config.get("generation.saturation_boost"),
        Some(&Setting::Float(1.3))
    );
}

/// The legacy template variable maps to `templates.directory`, alongside
/// the prefixed form for other keys.
#[test]
fn environment_naming_conventions() {
    let temp = tempdir().expect("tempdir");
    let config = context(
        &temp,
        &[
            ("COLORSCHEME_OUTPUT__DIRECTORY", "/tmp/x"),
            ("COLOR_SCHEME_TEMPLATES", "/tmp/t"),
        ],
    )
    .load_config()
    .expect("load");
    assert_eq!(
        config.get("output.directory").and_then(Setting::as_path),
        Some(Path::new("/tmp/x"))
    );
    assert_eq!(
        config.get("templates.directory").and_then(Setting::as_path),
        Some(Path::new("/tmp/t"))
    );
    assert!(config.get("color.scheme.templates").is_none());
    assert_eq!(
        config.namespaces().collect::<Vec<_>>(),
        vec!["generation", "output", "templates"]
    );
}

/// Environment selects the backend, the command line sets the boost.
#[test]
fn end_to_end_env_and_override() {
    let temp = tempdir().expect("tempdir");
    let context = SettingsContext::new();
    let mut registry = SchemaRegistry::new();
    registry
        .register("generation", generation_schema())
        .expect("generation");
    context.configure_registry(
        &registry,
        options(&temp, &[("COLORSCHEME_GENERATION__BACKEND", "wallust")]),
    );

    let base = context.load_config().expect("load");
    let overrides = Overrides::parse(["generation.saturation_boost=1.2"]).expect("parse");
    let config = apply_overrides(&base, &overrides).expect("apply");
    assert_eq!(
        config.get("generation.backend").and_then(Setting::as_str),
        Some("wallust")
    );
    assert_eq!(
        config.get("generation.saturation_boost"),
        Some(&Setting::Float(1.2))
    );

    #[derive(Debug, Deserialize, PartialEq)]
    struct Generation {
        backend: String,
        saturation_boost: f64,
    }
    assert_eq!(
        config.extract::<Generation>("generation").expect("extract"),
        Generation {
            backend: "wallust".to_string(),
            saturation_boost: 1.2,
        }
    );
}

/// An out-of-range override fails naming the field and bound, and the
/// cached base is left as it was.
#[test]
fn out_of_range_override_leaves_base_intact() {
    let temp = tempdir().expect("tempdir");
    let context = context(&temp, &[]);
    let base = context.load_config().expect("load");

    let overrides = Overrides::parse(["generation.saturation_boost=3.0"]).expect("parse");
    let err = context.get_config(Some(&overrides)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("generation.saturation_boost"));
    assert!(message.contains("must be <= 2.0"));

    let cached = context.load_config().expect("cached");
    assert!(Arc::ptr_eq(&base, &cached));
    assert_eq!(
        cached.get("generation.saturation_boost"),
        Some(&Setting::Float(1.0))
    );
}

/// Malformed project files are fatal and name the file.
#[test]
fn malformed_project_file_is_a_file_error() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("settings.toml"), "generation = [").expect("write");
    let err = context(&temp, &[]).load_config().unwrap_err();
    match err {
        SettingsError::File { path, .. } => {
            assert_eq!(path.file_name(), Some(PathBuf::from("settings.toml").as_os_str()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
