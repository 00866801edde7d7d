//! Table formatting for row-oriented command output
//!
//! Commands describe their columns once with [`ColumnDef`] and build
//! [`TableRow`]s of typed [`CellValue`]s; [`TableFormatter`] renders them as an
//! aligned table, TSV, CSV, Markdown or bare ids.

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::helpers::{format_qty, truncate_str};
use crate::cli::OutputFormat;

/// Column definition with header label and maximum text width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    /// Quantity, printed without trailing zeros
    Qty(f64),
    Number(u64),
    Flag(bool),
    Empty,
}

impl CellValue {
    /// Plain text for CSV/TSV/id output
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Qty(q) => format_qty(*q),
            CellValue::Number(n) => n.to_string(),
            CellValue::Flag(b) => if *b { "yes" } else { "no" }.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Text for the aligned table, truncated to `width`
    fn display(&self, width: usize) -> String {
        match self {
            CellValue::Text(s) => truncate_str(s, width),
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        }
    }

    fn format_md(&self) -> String {
        match self {
            CellValue::Empty => "-".to_string(),
            other => other.raw().replace('|', "\\|"),
        }
    }

    /// TSV cells cannot carry tabs or newlines
    fn format_tsv(&self) -> String {
        self.raw().replace(['\t', '\n'], " ")
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

/// A row of cell values keyed by column
#[derive(Debug, Default)]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: impl Into<CellValue>) -> Self {
        self.cells.push((key, value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl From<f64> for CellValue {
    fn from(q: f64) -> Self {
        CellValue::Qty(q)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Flag(b)
    }
}

/// Renders rows in one of the tabular output formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef]) -> Self {
        Self { columns }
    }

    /// Render rows; document formats (json/yaml) are the caller's job
    pub fn render(&self, rows: &[TableRow], format: OutputFormat) -> Result<String, csv::Error> {
        Ok(match format {
            OutputFormat::Csv => self.render_csv(rows)?,
            OutputFormat::Tsv => self.render_tsv(rows),
            OutputFormat::Md => self.render_md(rows),
            OutputFormat::Id => rows.iter().map(|r| format!("{}\n", r.id)).collect(),
            _ => self.render_table(rows),
        })
    }

    fn render_table(&self, rows: &[TableRow]) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.to_string()));
        for row in rows {
            builder.push_record(self.columns.iter().map(|c| {
                row.get(c.key)
                    .map(|v| v.display(c.width))
                    .unwrap_or_else(|| "-".to_string())
            }));
        }
        let mut table = builder.build();
        table.with(Style::sharp());
        format!("{}\n", table)
    }

    fn render_tsv(&self, rows: &[TableRow]) -> String {
        let mut out = self
            .columns
            .iter()
            .map(|c| c.header)
            .collect::<Vec<_>>()
            .join("\t");
        out.push('\n');
        for row in rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|c| row.get(c.key).map(CellValue::format_tsv).unwrap_or_default())
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }

    fn render_csv(&self, rows: &[TableRow]) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.key))?;
        for row in rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|c| row.get(c.key).map(CellValue::raw).unwrap_or_default()),
            )?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn render_md(&self, rows: &[TableRow]) -> String {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        let mut out = format!("| {} |\n", headers.join(" | "));
        out.push_str(&format!(
            "|{}|\n",
            headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        ));
        for row in rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    row.get(c.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out
    }
}
