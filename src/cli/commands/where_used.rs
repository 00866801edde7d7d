//! `flatbom where-used` command - Find the assemblies that use a part

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{open_project, with_source};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::PartId;
use crate::core::Config;
use crate::entities::{BomItem, Part};

#[derive(clap::Args, Debug)]
pub struct WhereUsedArgs {
    /// Part to search for
    pub part_id: PartId,

    /// Read YAML files directly instead of the SQLite cache
    #[arg(long)]
    pub no_cache: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("parent_id", "Parent", 8),
    ColumnDef::new("ipn", "IPN", 16),
    ColumnDef::new("name", "Name", 28),
    ColumnDef::new("quantity", "Qty", 10),
    ColumnDef::new("reference", "Reference", 20),
    ColumnDef::new("note", "Note", 30),
];

/// One BOM line that references the searched part
#[derive(Debug, Serialize)]
struct Usage<'a> {
    parent_id: PartId,
    ipn: &'a str,
    name: &'a str,
    quantity: f64,
    reference: &'a str,
    note: &'a str,
    optional: bool,
}

impl<'a> Usage<'a> {
    fn new(parent: &'a Part, item: &'a BomItem) -> Self {
        Self {
            parent_id: parent.id,
            ipn: &parent.ipn,
            name: &parent.name,
            quantity: item.quantity,
            reference: &item.reference,
            note: &item.note,
            optional: item.optional,
        }
    }
}

pub fn run(args: WhereUsedArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let format = global.format.resolve(&config);

    let (part, parents) = with_source(&project, args.no_cache, |source| {
        let part = source.part(args.part_id)?;
        Ok((part, source.parents_of(args.part_id)?))
    })?;

    let Some(part) = part else {
        return Err(miette::miette!("part {} not found", args.part_id));
    };

    let usages: Vec<Usage> = parents.iter().map(|(p, item)| Usage::new(p, item)).collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&usages).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&usages).into_diagnostic()?);
        }
        _ => {
            if format == OutputFormat::Table && !global.quiet {
                println!(
                    "{} {} {}",
                    style("Where used:").bold(),
                    style(&part.ipn).cyan(),
                    part.name
                );
            }
            if usages.is_empty() {
                if !global.quiet {
                    println!("{}", style("Not used in any assembly.").yellow());
                }
                return Ok(());
            }
            let rows: Vec<TableRow> = usages.iter().map(table_row).collect();
            let out = TableFormatter::new(COLUMNS)
                .render(&rows, format)
                .into_diagnostic()?;
            print!("{}", out);
        }
    }

    Ok(())
}

fn table_row(usage: &Usage) -> TableRow {
    TableRow::new(usage.parent_id)
        .cell("parent_id", CellValue::Number(usage.parent_id.get()))
        .cell("ipn", usage.ipn)
        .cell("name", usage.name)
        .cell("quantity", usage.quantity)
        .cell("reference", usage.reference)
        .cell("note", usage.note)
}
