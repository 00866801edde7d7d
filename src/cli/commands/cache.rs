//! `flatbom cache` command - Manage the part cache
//!
//! The cache is a local SQLite database holding every part, BOM line,
//! category and supplier of the project. It is gitignored and re-syncs
//! itself from the YAML files whenever a command opens it.

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::cache::PartCache;

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Rebuild the cache from scratch
    Rebuild,

    /// Sync cache with filesystem changes (incremental)
    Sync,

    /// Show cache statistics
    Status,

    /// Delete the cache database
    Clear,
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CacheCommands::Rebuild => run_rebuild(global),
        CacheCommands::Sync => run_sync(global),
        CacheCommands::Status => run_status(global),
        CacheCommands::Clear => run_clear(global),
    }
}

fn run_rebuild(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut cache = PartCache::open_without_sync(&project)?;

    if !global.quiet {
        println!("{} Rebuilding cache...", style("→").blue());
    }
    let stats = cache.rebuild()?;

    println!(
        "{} Cache rebuilt in {}ms",
        style("✓").green(),
        stats.duration_ms
    );
    println!("  Files scanned: {}", stats.files_scanned);
    println!("  Files cached:  {}", stats.files_added);
    if stats.files_skipped > 0 {
        println!(
            "  Skipped:       {} (run 'flatbom validate')",
            style(stats.files_skipped).yellow()
        );
    }

    Ok(())
}

fn run_sync(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut cache = PartCache::open_without_sync(&project)?;

    let stats = cache.sync()?;

    if !stats.changed() {
        println!("{} Cache is up to date", style("✓").green());
        return Ok(());
    }

    println!(
        "{} Cache synced in {}ms",
        style("✓").green(),
        stats.duration_ms
    );
    if stats.files_added > 0 {
        println!("  Added:   {}", style(stats.files_added).green());
    }
    if stats.files_updated > 0 {
        println!("  Updated: {}", style(stats.files_updated).yellow());
    }
    if stats.files_removed > 0 {
        println!("  Removed: {}", style(stats.files_removed).red());
    }
    if stats.files_skipped > 0 {
        println!("  Skipped: {}", style(stats.files_skipped).yellow());
    }

    Ok(())
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let cache = PartCache::open(&project)?;
    let stats = cache.statistics()?;

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Location:    {}", PartCache::path(&project).display());
    println!("  Files:       {}", style(stats.files).cyan());
    println!("  Parts:       {}", style(stats.parts).cyan());
    println!("  BOM lines:   {}", style(stats.bom_items).cyan());
    println!("  Categories:  {}", style(stats.categories).cyan());
    println!("  Suppliers:   {}", style(stats.suppliers).cyan());
    println!(
        "  Size:        {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );
    if let Some(last_sync) = stats.last_sync {
        println!(
            "  Last sync:   {}",
            last_sync.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

fn run_clear(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;

    if PartCache::remove(&project)? {
        println!("{} Cache cleared", style("✓").green());
    } else {
        println!("{} No cache to clear", style("•").dim());
    }

    Ok(())
}
