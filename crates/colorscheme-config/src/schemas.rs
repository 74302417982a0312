//! Settings schemas for the color-scheme subsystems.

use colorscheme_settings::{Field, Schema, SchemaRegistry, SettingsError};

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
const OUTPUT_FORMATS: [&str; 8] = [
    "json",
    "sh",
    "css",
    "gtk.css",
    "yaml",
    "sequences",
    "rasi",
    "scss",
];
const BACKENDS: [&str; 3] = ["pywal", "wallust", "custom"];
const PYWAL_ALGORITHMS: [&str; 5] = ["wal", "colorz", "colorthief", "haishoku", "schemer2"];

/// Registry holding every subsystem namespace.
pub(crate) fn builtin_registry() -> Result<SchemaRegistry, SettingsError> {
    let mut registry = SchemaRegistry::new();
    registry.register("logging", logging()?)?;
    registry.register("output", output()?)?;
    registry.register("generation", generation()?)?;
    registry.register("backends", backends()?)?;
    registry.register("templates", templates()?)?;
    registry.register("container", container()?)?;
    Ok(registry)
}

fn logging() -> Result<Schema, SettingsError> {
    Schema::builder()
        .field(
            "level",
            Field::enumeration(LOG_LEVELS)
                .case_insensitive()
                .default("INFO")
                .describe("Log level"),
        )
        .field(
            "show_time",
            Field::bool()
                .default(true)
                .describe("Show timestamps in log messages"),
        )
        .field(
            "show_path",
            Field::bool()
                .default(false)
                .describe("Show source paths in log messages"),
        )
        .build()
}

fn output() -> Result<Schema, SettingsError> {
    Schema::builder()
        .field(
            "directory",
            Field::path()
                .default("$HOME/.config/color-scheme/output")
                .describe("Directory generated files are written to"),
        )
        .field(
            "formats",
            Field::list(Field::enumeration(OUTPUT_FORMATS))
                .default(OUTPUT_FORMATS.to_vec())
                .describe("Output formats to generate"),
        )
        .build()
}

fn generation() -> Result<Schema, SettingsError> {
    Schema::builder()
        .field(
            "backend",
            Field::enumeration(BACKENDS)
                .default("pywal")
                .describe("Default backend for color extraction"),
        )
        .field(
            "saturation_boost",
            Field::float_in(0.5, 2.0)
                .default(1.0)
                .describe("Saturation adjustment factor"),
        )
        .build()
}

fn backends() -> Result<Schema, SettingsError> {
    let pywal = Schema::builder()
        .field(
            "backend_algorithm",
            Field::enumeration(PYWAL_ALGORITHMS).default("haishoku"),
        )
        .build()?;
    let wallust = Schema::builder()
        .field("backend_type", Field::string().default("resized"))
        .build()?;
    let custom = Schema::builder()
        .field(
            "algorithm",
            Field::enumeration(["kmeans", "dominant"]).default("kmeans"),
        )
        .field(
            "n_clusters",
            Field::integer_in(8, 256)
                .default(16_i64)
                .describe("Number of color clusters"),
        )
        .build()?;
    Schema::builder()
        .table("pywal", pywal)
        .table("wallust", wallust)
        .table("custom", custom)
        .build()
}

fn templates() -> Result<Schema, SettingsError> {
    Schema::builder()
        .field(
            "directory",
            Field::path()
                .default("templates")
                .describe("Directory containing output templates"),
        )
        .build()
}

fn container() -> Result<Schema, SettingsError> {
    Schema::builder()
        .field(
            "engine",
            Field::enumeration(["docker", "podman"])
                .case_insensitive()
                .default("docker"),
        )
        .field(
            "image_registry",
            Field::string_matching(r"^\S*[^/\s]$")?
                .describe("Registry prefix for container images, without a trailing slash"),
        )
        .build()
}
