//! `flatbom flat` command - Flatten an assembly into a deduplicated part list

use std::path::PathBuf;

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::bom::enrich::{enrich, EnrichedRow, ShortfallOptions};
use crate::bom::{flatten_bom, settings, FlatBom, Warning};
use crate::cli::helpers::{open_project, with_source, write_output};
use crate::cli::table::{ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::PartId;
use crate::core::store::BomSource;
use crate::core::Config;
use crate::schema::template::{ReportRenderer, FLAT_BOM_MARKDOWN};

#[derive(clap::Args, Debug)]
pub struct FlatArgs {
    /// Top-level assembly to flatten
    pub part_id: PartId,

    /// Stop expanding assemblies at this depth (overrides config)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Expand assemblies bought from outside suppliers
    #[arg(long)]
    pub expand_purchased: bool,

    /// Build cut lists for stock consumed by internal-fab assemblies
    #[arg(long)]
    pub internal_fab_cuts: bool,

    /// Number of top-level assemblies to build
    #[arg(long, short = 'n', default_value = "1")]
    pub build_qty: f64,

    /// Subtract allocated stock from what is available
    #[arg(long)]
    pub include_allocations: bool,

    /// Count stock on order as available
    #[arg(long)]
    pub include_on_order: bool,

    /// Read YAML files directly instead of the SQLite cache
    #[arg(long)]
    pub no_cache: bool,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("ipn", "IPN", 16),
    ColumnDef::new("name", "Name", 28),
    ColumnDef::new("category", "Category", 14),
    ColumnDef::new("qty", "Qty", 10),
    ColumnDef::new("unit", "Unit", 6),
    ColumnDef::new("required", "Required", 10),
    ColumnDef::new("in_stock", "In stock", 10),
    ColumnDef::new("shortfall", "Short", 10),
    ColumnDef::new("reference", "Reference", 30),
];

/// Header of the json/yaml/markdown document
#[derive(Debug, Serialize)]
struct ReportMetadata<'a> {
    part_id: PartId,
    ipn: &'a str,
    part_name: &'a str,
    build_qty: f64,
    leaf_count: usize,
    internal_fab_count: usize,
    max_depth_reached: usize,
    generated: String,
    warnings: &'a [Warning],
}

#[derive(Debug, Serialize)]
struct FlatReport<'a> {
    metadata: ReportMetadata<'a>,
    rows: &'a [EnrichedRow],
}

pub fn run(args: FlatArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let format = global.format.resolve(&config);

    let shortfall = ShortfallOptions {
        build_qty: args.build_qty,
        include_allocations: args.include_allocations,
        include_on_order: args.include_on_order,
    };

    let (bom, rows) = with_source(&project, args.no_cache, |source| {
        generate(source, &config, &args, &shortfall)
    })?;

    let report = FlatReport {
        metadata: ReportMetadata {
            part_id: bom.part_id,
            ipn: &bom.ipn,
            part_name: &bom.part_name,
            build_qty: args.build_qty,
            leaf_count: bom.leaf_count,
            internal_fab_count: bom.internal_fab_count,
            max_depth_reached: bom.max_depth_reached,
            generated: Utc::now().to_rfc3339(),
            warnings: &bom.warnings,
        },
        rows: &rows,
    };

    let content = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yml::to_string(&report).into_diagnostic()?,
        OutputFormat::Md => ReportRenderer::new()?.render(FLAT_BOM_MARKDOWN, &report)?,
        _ => {
            let table_rows: Vec<TableRow> = rows.iter().map(table_row).collect();
            TableFormatter::new(COLUMNS)
                .render(&table_rows, format)
                .into_diagnostic()?
        }
    };

    if format == OutputFormat::Table && !global.quiet {
        eprintln!(
            "{} {} ({}): {} unique parts, {} leaf occurrences, depth {}",
            style("Flat BOM").bold(),
            style(&bom.ipn).cyan(),
            bom.part_name,
            rows.len(),
            bom.leaf_count,
            bom.max_depth_reached
        );
    }

    write_output(&content, args.output.as_deref(), global.quiet)?;

    // json, yaml and markdown carry the warnings in the document itself
    if !format.is_document() && format != OutputFormat::Md && !global.quiet {
        print_warnings(&bom.warnings);
    }
    Ok(())
}

/// Resolve settings against `source`, apply command-line overrides and flatten
fn generate<S: BomSource + ?Sized>(
    source: &S,
    config: &Config,
    args: &FlatArgs,
    shortfall: &ShortfallOptions,
) -> Result<(FlatBom, Vec<EnrichedRow>)> {
    let mut options = settings::resolve(config, source)?;
    if args.max_depth.is_some() {
        options.max_depth = args.max_depth;
    }
    if args.expand_purchased {
        options.expand_purchased_assemblies = true;
    }
    if args.internal_fab_cuts {
        options.enable_internal_fab_cuts = true;
    }

    let mut bom = flatten_bom(source, args.part_id, &options)?;
    let rows = enrich(source, std::mem::take(&mut bom.rows), shortfall)?;
    Ok((bom, rows))
}

fn table_row(row: &EnrichedRow) -> TableRow {
    let r = &row.row;
    TableRow::new(r.part_id)
        .cell("ipn", r.ipn.as_str())
        .cell("name", r.name.as_str())
        .cell("category", r.category.as_str())
        .cell("qty", r.total_qty)
        .cell("unit", r.unit.as_str())
        .cell("required", row.total_required)
        .cell("in_stock", row.in_stock)
        .cell("shortfall", row.shortfall)
        .cell("reference", r.reference.as_str())
}

fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{} ({})", style("Warnings").yellow().bold(), warnings.len());
    for warning in warnings {
        eprintln!(
            "  {} {} {}",
            style("!").yellow(),
            style(warning.kind.as_str()).dim(),
            warning.message
        );
    }
}
