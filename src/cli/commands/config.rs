//! `flatbom config` command - Configuration management
//!
//! Provides commands to view and modify the global and project config files.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (see `flatbom config keys`)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("primary_internal_supplier", "Supplier id of the in-house shop"),
    (
        "additional_internal_suppliers",
        "More in-house supplier ids, comma separated",
    ),
    ("fabrication_category", "Category id of fabricated parts"),
    ("commercial_category", "Category id of commercial parts"),
    (
        "cut_to_length_category",
        "Category id of stock cut to length",
    ),
    (
        "expand_purchased_assemblies",
        "List the children of purchased assemblies (true/false)",
    ),
    ("max_depth", "Stop expanding BOMs at this level"),
    (
        "enable_internal_fab_cuts",
        "Cut lists for stock consumed by internal-fab assemblies (true/false)",
    ),
    (
        "internal_fab_cut_units",
        "Units eligible for internal-fab cut lists (default mm,in,cm,ft)",
    ),
    (
        "default_format",
        "Default output format (table, json, yaml, csv, tsv, md, id)",
    ),
    ("log_level", "Log filter, e.g. info or flatbom=debug"),
    ("log_format", "Log output: text or json"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global).ok();
    let config = Config::load_for(project.as_ref());

    if let Some(key) = &args.key {
        check_key(key)?;
        return match config_value(&config, key)? {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        match config_value(&config, key)? {
            Some(v) => println!("  {}: {}", style(key).cyan(), style(v).yellow()),
            None => println!("  {}: {}", style(key).cyan(), style("(not set)").dim()),
        }
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (FLATBOM_MAX_DEPTH, FLATBOM_LOG)");
    println!("  2. Project config (.flatbom/config.yaml)");
    println!("  3. Global config (~/.config/flatbom/config.yaml)");

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;

    let mut config_map = read_mapping(&config_path)?;
    let value: serde_yml::Value = serde_yml::from_str(&args.value)
        .unwrap_or_else(|_| serde_yml::Value::String(args.value.clone()));
    config_map.insert(serde_yml::Value::String(args.key.clone()), value);

    // Reject values the loader would not accept
    let document = serde_yml::Value::Mapping(config_map);
    if let Err(e) = serde_yml::from_value::<Config>(document.clone()) {
        return Err(miette::miette!(
            "Invalid value '{}' for {}: {}",
            args.value,
            args.key,
            e
        ));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&document).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = target_path(args.global, global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map.remove(args.key.as_str()).is_none() {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global: ", &path),
        None => println!("  {} {}", style("Global: ").cyan(), style("(unavailable)").dim()),
    }

    match open_project(global) {
        Ok(project) => print_path("Project:", &Config::project_config_path(&project)),
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a flat-BOM project)").dim()
        ),
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<30} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'flatbom config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

fn print_path(label: &str, path: &std::path::Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {} {} {}", style(label).cyan(), path.display(), state);
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'flatbom config keys' to list them",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

fn target_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        let project = open_project(global)?;
        Ok(Config::project_config_path(&project))
    }
}

/// Existing config file as a mapping; a missing or empty file is an empty mapping
fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!(
            "{} does not contain a YAML mapping",
            path.display()
        )),
    }
}

/// Effective value of one key as text, `None` when unset
fn config_value(config: &Config, key: &str) -> Result<Option<String>> {
    let value = serde_yml::to_value(config).into_diagnostic()?;
    Ok(value.get(key).and_then(|v| match v {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}
