//! Shared helper functions for CLI commands

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::cache::PartCache;
use crate::core::project::Project;
use crate::core::store::{BomSource, PartStore};

/// Locate the project from `--project` or the working directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    Ok(Project::open(global.project.as_deref())?)
}

/// Run `f` against the project's SQLite cache, or against the YAML files
/// directly when `no_cache` is set
pub fn with_source<T>(
    project: &Project,
    no_cache: bool,
    f: impl FnOnce(&dyn BomSource) -> Result<T>,
) -> Result<T> {
    if no_cache {
        let store = PartStore::load(project)?;
        f(&store)
    } else {
        let cache = PartCache::open(project)?;
        f(&cache)
    }
}

/// Quantity without trailing zeros: `4`, `2.5`, `0.125`
pub fn format_qty(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Write rendered output to a file, or to stdout
pub fn write_output(content: &str, path: Option<&Path>, quiet: bool) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            if !quiet {
                eprintln!(
                    "{} Written to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_qty() {
        assert_eq!(format_qty(4.0), "4");
        assert_eq!(format_qty(2.5), "2.5");
        assert_eq!(format_qty(0.125), "0.125");
        assert_eq!(format_qty(1.0 / 3.0), "0.3333");
        assert_eq!(format_qty(-2.0), "-2");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_write_output_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        write_output("a,b\n", Some(&path), true).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
