//! `flatbom tree` command - Show the expanded BOM of an assembly

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::bom::{build_tree, settings, TraversalStats, TreeNode};
use crate::cli::helpers::{format_qty, open_project, with_source};
use crate::cli::table::{ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::PartId;
use crate::core::store::BomSource;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// Assembly to show
    pub part_id: PartId,

    /// Stop expanding assemblies at this depth (overrides config)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Read YAML files directly instead of the SQLite cache
    #[arg(long)]
    pub no_cache: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("level", "Level", 5),
    ColumnDef::new("ipn", "IPN", 16),
    ColumnDef::new("name", "Name", 28),
    ColumnDef::new("category", "Category", 14),
    ColumnDef::new("qty", "Qty", 10),
    ColumnDef::new("cumulative", "Cumulative", 10),
    ColumnDef::new("note", "Note", 30),
];

pub fn run(args: TreeArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let format = global.format.resolve(&config);

    let (tree, stats) = with_source(&project, args.no_cache, |source| {
        load_tree(source, &config, &args)
    })?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tree).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&tree).into_diagnostic()?);
        }
        OutputFormat::Table => {
            print!("{}", render_tree(&tree));
            if !global.quiet {
                println!();
                println!(
                    "{} nodes, depth {}{}",
                    style(tree.node_count()).cyan(),
                    style(stats.max_depth_reached).cyan(),
                    if stats.internal_fab_count > 0 {
                        format!(", {} internal fab", stats.internal_fab_count)
                    } else {
                        String::new()
                    }
                );
            }
        }
        _ => {
            let mut rows = Vec::new();
            collect_rows(&tree, &mut rows);
            let out = TableFormatter::new(COLUMNS)
                .render(&rows, format)
                .into_diagnostic()?;
            print!("{}", out);
        }
    }

    Ok(())
}

fn load_tree<S: BomSource + ?Sized>(
    source: &S,
    config: &Config,
    args: &TreeArgs,
) -> Result<(TreeNode, TraversalStats)> {
    let mut options = settings::resolve(config, source)?;
    if args.max_depth.is_some() {
        options.max_depth = args.max_depth;
    }
    Ok(build_tree(source, args.part_id, &options)?)
}

/// Box-drawn tree, one line per node
fn render_tree(root: &TreeNode) -> String {
    let mut out = format!("{}\n", node_label(root));
    let count = root.children.len();
    for (i, child) in root.children.iter().enumerate() {
        render_branch(child, "", i + 1 == count, &mut out);
    }
    out
}

fn render_branch(node: &TreeNode, prefix: &str, last: bool, out: &mut String) {
    let connector = if last { "└── " } else { "├── " };
    out.push_str(&format!(
        "{}{}{} x {}\n",
        prefix,
        connector,
        format_qty(node.quantity),
        node_label(node)
    ));

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_branch(child, &child_prefix, i + 1 == count, out);
    }
}

fn node_label(node: &TreeNode) -> String {
    let mut label = format!("{} {} [{}]", node.ipn, node.name, node.category);
    if node.level > 0 {
        label.push_str(&format!(" (total {})", format_qty(node.cumulative_qty)));
    }
    if !node.note.is_empty() {
        label.push_str(&format!(" \"{}\"", node.note));
    }
    if node.max_depth_exceeded {
        label.push_str(" ... (max depth)");
    }
    label
}

fn collect_rows(node: &TreeNode, rows: &mut Vec<TableRow>) {
    rows.push(
        TableRow::new(node.part_id)
            .cell("level", node.level.to_string())
            .cell("ipn", node.ipn.as_str())
            .cell("name", node.name.as_str())
            .cell("category", node.category.as_str())
            .cell("qty", node.quantity)
            .cell("cumulative", node.cumulative_qty)
            .cell("note", node.note.as_str()),
    );
    for child in &node.children {
        collect_rows(child, rows);
    }
}
