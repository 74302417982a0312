//! Inspect how color-scheme settings resolve across defaults, files, the
//! environment, and command-line overrides.

mod schemas;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use colorscheme_settings::{
    Overrides, ResolvedConfig, Setting, SettingsContext, SettingsOptions,
};
use log::{LevelFilter, debug, info};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Command-line options for the settings inspector.
#[derive(Parser)]
#[command(name = "colorscheme-config", version)]
struct Cli {
    /// Directory containing the project settings.toml (defaults to the cwd)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,
    /// User settings file (defaults to ~/.config/color-scheme/settings.toml)
    #[arg(long, global = true)]
    user_config: Option<PathBuf>,
    /// Override a setting; repeatable
    #[arg(long = "set", value_name = "PATH=VALUE", global = true)]
    overrides: Vec<String>,
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every resolved setting with the layer that supplied it
    Show {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print one resolved value or namespace
    Get {
        /// Dotted setting path, e.g. generation.backend
        path: String,
    },
    /// Load the configuration and report whether it is valid
    Validate,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!(
        "starting settings inspector (project_root_set={}, user_config_set={}, overrides={})",
        cli.project_root.is_some(),
        cli.user_config.is_some(),
        cli.overrides.len()
    );

    let registry = schemas::builtin_registry().context("failed to register settings schemas")?;
    let mut options = SettingsOptions::new();
    if let Some(root) = cli.project_root.as_ref() {
        options = options.with_project_root(root);
    }
    if let Some(path) = cli.user_config.as_ref() {
        options = options.with_user_config_path(path);
    }
    let context = SettingsContext::new();
    context.configure_registry(&registry, options);
    let overrides = Overrides::parse(&cli.overrides).context("invalid --set value")?;
    debug!("parsed overrides (keys={:?})", overrides.keys().collect::<Vec<_>>());

    match cli.command {
        Command::Show { json } => {
            let resolved = context
                .resolve_with_sources(Some(&overrides))
                .context("failed to resolve settings")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                print!("{}", render_resolved(&resolved));
            }
        }
        Command::Get { path } => {
            let config = context
                .get_config(Some(&overrides))
                .context("failed to load settings")?;
            let Some(value) = config.get(&path) else {
                bail!("unknown setting: {path}");
            };
            println!("{}", render_setting(value));
        }
        Command::Validate => {
            let config = context
                .get_config(Some(&overrides))
                .context("settings are invalid")?;
            println!(
                "settings are valid ({} namespaces)",
                config.namespaces().count()
            );
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::builder()
        .filter_level(level)
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

/// One `path = value  (layer: detail)` line per resolved setting.
fn render_resolved(resolved: &ResolvedConfig) -> String {
    let mut out = String::new();
    for (path, value) in resolved.iter() {
        let _ = writeln!(
            out,
            "{path} = {}  ({}: {})",
            value.value.to_value(),
            value.source,
            value.source_detail
        );
        for shadowed in &value.overridden {
            let _ = writeln!(
                out,
                "    shadows {} from {} ({})",
                shadowed.value, shadowed.layer, shadowed.source_detail
            );
        }
    }
    out
}

/// Plain rendering for `get`: bare strings and paths, TOML for the rest.
fn render_setting(value: &Setting) -> String {
    match value {
        Setting::String(text) => text.clone(),
        Setting::Path(path) => path.display().to_string(),
        Setting::Table(_) => toml::to_string(&value.to_value())
            .map(|text| text.trim_end().to_string())
            .unwrap_or_else(|_| value.to_value().to_string()),
        other => other.to_value().to_string(),
    }
}
