//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    cache::CacheCommands, completions::CompletionsArgs, config::ConfigCommands, flat::FlatArgs,
    init::InitArgs, tree::TreeArgs, validate::ValidateArgs, where_used::WhereUsedArgs,
};
use crate::core::Config;

#[derive(Parser)]
#[command(name = "flatbom")]
#[command(author, version, about = "Flat BOM generator")]
#[command(
    long_about = "Collapse a multi-level bill of materials, stored as plain YAML records, into one deduplicated list of parts to buy, cut and fabricate."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .flatbom/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new flat-BOM project
    Init(InitArgs),

    /// Flatten an assembly into a deduplicated part list
    Flat(FlatArgs),

    /// Show the expanded BOM tree of an assembly
    Tree(TreeArgs),

    /// List the assemblies that use a part directly
    WhereUsed(WhereUsedArgs),

    /// Validate project files against schemas
    Validate(ValidateArgs),

    /// Manage the local SQLite cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Configured default, otherwise a table
    #[default]
    Auto,
    /// Aligned table for the terminal
    Table,
    /// YAML document (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON document (for programming)
    Json,
    /// CSV (for spreadsheets)
    Csv,
    /// Markdown report
    Md,
    /// Just part ids, one per line
    Id,
}

impl OutputFormat {
    /// Replace `Auto` with the configured default format, or `Table`
    pub fn resolve(self, config: &Config) -> OutputFormat {
        if self != OutputFormat::Auto {
            return self;
        }
        config
            .default_format
            .as_deref()
            .and_then(|name| OutputFormat::from_str(name, true).ok())
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(OutputFormat::Table)
    }

    /// Formats that produce a single structured document
    pub fn is_document(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_auto_format_resolution() {
        let mut config = Config::default();
        assert_eq!(OutputFormat::Auto.resolve(&config), OutputFormat::Table);

        config.default_format = Some("JSON".to_string());
        assert_eq!(OutputFormat::Auto.resolve(&config), OutputFormat::Json);
        assert_eq!(OutputFormat::Csv.resolve(&config), OutputFormat::Csv);

        config.default_format = Some("bogus".to_string());
        assert_eq!(OutputFormat::Auto.resolve(&config), OutputFormat::Table);
    }

    #[test]
    fn test_parse_flat_command() {
        let cli = Cli::try_parse_from([
            "flatbom",
            "flat",
            "12",
            "--max-depth",
            "3",
            "--build-qty",
            "5",
            "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.global.format, OutputFormat::Json);
        match cli.command {
            Commands::Flat(args) => {
                assert_eq!(args.part_id.get(), 12);
                assert_eq!(args.max_depth, Some(3));
                assert_eq!(args.build_qty, 5.0);
            }
            _ => panic!("expected flat"),
        }
    }
}
