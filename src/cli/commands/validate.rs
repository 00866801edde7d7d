//! `flatbom validate` command - Validate project files against schemas

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use console::style;
use miette::Result;
use walkdir::WalkDir;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityKind;
use crate::core::loader::{is_data_file, load_all};
use crate::core::project::Project;
use crate::entities::{Category, Part, Supplier};
use crate::schema::registry::SchemaRegistry;
use crate::schema::validator::{FileCheckError, Validator};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to validate (default: entire project)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
}

/// A cross-file problem found after every file parsed
#[derive(Debug, Clone, PartialEq)]
struct ReferenceIssue {
    path: PathBuf,
    message: String,
    /// Errors break traversal; warnings only degrade it
    error: bool,
}

impl ReferenceIssue {
    fn error(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            message,
            error: true,
        }
    }

    fn warning(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            message,
            error: false,
        }
    }
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let validator = Validator::new(&SchemaRegistry::default());
    let quiet = global.quiet || args.summary;

    let files = if args.paths.is_empty() {
        project_files(&project)
    } else {
        expand_paths(&args.paths)
    };

    if !quiet {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files.len()
        );
    }

    let mut stats = ValidationStats::default();

    for path in &files {
        match validator.validate_file(path) {
            Ok(None) => {
                if !quiet {
                    println!(
                        "{} {} - not in a parts, categories or suppliers directory (skipped)",
                        style("?").yellow(),
                        path.display()
                    );
                }
            }
            Ok(Some(_)) => {
                stats.files_checked += 1;
                stats.files_passed += 1;
                if !quiet {
                    println!("{} {}", style("✓").green(), path.display());
                }
            }
            Err(FileCheckError::Invalid(e)) => {
                stats.files_checked += 1;
                stats.files_failed += 1;
                stats.total_errors += e.violation_count();
                if !quiet {
                    println!(
                        "{} {} - {} error(s)",
                        style("✗").red(),
                        path.display(),
                        e.violation_count()
                    );
                    println!("{:?}", miette::Report::new(e));
                }
            }
            Err(FileCheckError::Io(e)) => {
                stats.files_checked += 1;
                stats.files_failed += 1;
                stats.total_errors += 1;
                if !quiet {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
            }
        }
    }

    // Cross-file references only make sense against the whole project
    if args.paths.is_empty() {
        let issues = check_references(
            &load_all::<Part>(&project, EntityKind::Part),
            &load_all::<Category>(&project, EntityKind::Category),
            &load_all::<Supplier>(&project, EntityKind::Supplier),
        );
        if !issues.is_empty() && !quiet {
            println!();
            println!("{}", style("References").bold());
        }
        for issue in &issues {
            let is_error = issue.error || args.strict;
            if is_error {
                stats.total_errors += 1;
            } else {
                stats.total_warnings += 1;
            }
            if !quiet {
                let marker = if is_error {
                    style("✗").red()
                } else {
                    style("!").yellow()
                };
                println!("{} {} - {}", marker, issue.path.display(), issue.message);
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    println!();

    if stats.total_errors > 0 {
        Err(miette::miette!(
            "Validation failed: {} error(s)",
            stats.total_errors
        ))
    } else {
        println!("{} All files passed validation!", style("✓").green().bold());
        Ok(())
    }
}

/// Every data file of every record kind
fn project_files(project: &Project) -> Vec<PathBuf> {
    EntityKind::all()
        .iter()
        .flat_map(|kind| project.iter_entity_files(*kind))
        .collect()
}

/// Expand directories into the data files below them
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if is_data_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    files
}

/// Duplicate ids, dangling references and self-referencing BOM lines
fn check_references(
    parts: &[(PathBuf, Part)],
    categories: &[(PathBuf, Category)],
    suppliers: &[(PathBuf, Supplier)],
) -> Vec<ReferenceIssue> {
    let mut issues = Vec::new();

    let part_ids = unique_ids(parts, |p| p.id, EntityKind::Part, &mut issues);
    let category_ids = unique_ids(categories, |c| c.id, EntityKind::Category, &mut issues);
    let supplier_ids = unique_ids(suppliers, |s| s.id, EntityKind::Supplier, &mut issues);

    for (path, category) in categories {
        if let Some(parent) = category.parent {
            if !category_ids.contains(&parent) {
                issues.push(ReferenceIssue::warning(
                    path,
                    format!("parent category {} does not exist", parent),
                ));
            }
        }
    }

    for (path, part) in parts {
        if let Some(category) = part.category {
            if !category_ids.contains(&category) {
                issues.push(ReferenceIssue::warning(
                    path,
                    format!("category {} does not exist", category),
                ));
            }
        }
        if let Some(supplier) = part.default_supplier {
            if !supplier_ids.contains(&supplier) {
                issues.push(ReferenceIssue::warning(
                    path,
                    format!("default supplier {} does not exist", supplier),
                ));
            }
        }
        if !part.assembly && !part.bom.is_empty() {
            issues.push(ReferenceIssue::warning(
                path,
                format!(
                    "part {} has BOM lines but is not an assembly; they are ignored",
                    part.id
                ),
            ));
        }
        for (i, item) in part.bom.iter().enumerate() {
            if item.sub_part == part.id {
                issues.push(ReferenceIssue::error(
                    path,
                    format!("BOM line {} references the part itself", i + 1),
                ));
            } else if !part_ids.contains(&item.sub_part) {
                issues.push(ReferenceIssue::error(
                    path,
                    format!("BOM line {} references missing part {}", i + 1, item.sub_part),
                ));
            }
        }
    }

    issues
}

fn unique_ids<T, I: Ord + Copy + std::fmt::Display>(
    records: &[(PathBuf, T)],
    id_of: impl Fn(&T) -> I,
    kind: EntityKind,
    issues: &mut Vec<ReferenceIssue>,
) -> BTreeSet<I> {
    let mut seen: BTreeMap<I, &Path> = BTreeMap::new();
    for (path, record) in records {
        let id = id_of(record);
        if let Some(first) = seen.get(&id) {
            issues.push(ReferenceIssue::error(
                path,
                format!("duplicate {} id {} (also in {})", kind, id, first.display()),
            ));
        } else {
            seen.insert(id, path);
        }
    }
    seen.into_keys().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::PartId;
    use crate::entities::BomItem;

    fn at(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn test_clean_project_has_no_issues() {
        let parts = vec![
            (
                at("a.fbom.yaml"),
                Part::new(1, "ASM", "Frame")
                    .as_assembly()
                    .with_category(5)
                    .with_item(BomItem::new(PartId(2), 4.0)),
            ),
            (at("b.fbom.yaml"), Part::new(2, "BLT", "Bolt").with_supplier(1)),
        ];
        let categories = vec![(at("c.fbom.yaml"), Category::new(5, "Fab", None))];
        let suppliers = vec![(at("s.fbom.yaml"), Supplier::new(1, "Acme"))];

        assert!(check_references(&parts, &categories, &suppliers).is_empty());
    }

    #[test]
    fn test_dangling_and_duplicate_references() {
        let parts = vec![
            (
                at("a.fbom.yaml"),
                Part::new(1, "ASM", "Frame")
                    .as_assembly()
                    .with_item(BomItem::new(PartId(1), 1.0))
                    .with_item(BomItem::new(PartId(9), 2.0)),
            ),
            (at("b.fbom.yaml"), Part::new(2, "BLT", "Bolt").with_category(77)),
            (at("c.fbom.yaml"), Part::new(2, "NUT", "Nut")),
        ];

        let issues = check_references(&parts, &[], &[]);
        let errors: Vec<&str> = issues
            .iter()
            .filter(|i| i.error)
            .map(|i| i.message.as_str())
            .collect();
        assert_eq!(
            errors,
            vec![
                "duplicate part id 2 (also in b.fbom.yaml)",
                "BOM line 1 references the part itself",
                "BOM line 2 references missing part 9",
            ]
        );
        assert!(issues
            .iter()
            .any(|i| !i.error && i.message == "category 77 does not exist"));
    }

    #[test]
    fn test_bom_on_plain_part_is_a_warning() {
        let parts = vec![
            (
                at("a.fbom.yaml"),
                Part::new(1, "BRK", "Bracket").with_item(BomItem::new(PartId(2), 1.0)),
            ),
            (at("b.fbom.yaml"), Part::new(2, "BLT", "Bolt")),
        ];
        let issues = check_references(&parts, &[], &[]);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].error);
    }
}
