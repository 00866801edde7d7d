//! Deduplication of leaf records into one row per part

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::bom::categorize::CategoryTag;
use crate::bom::leaves::LeafRecord;
use crate::core::identity::{PartId, SupplierId};

/// Pieces of one length cut from cut-to-length stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutListEntry {
    pub quantity: f64,
    pub length: f64,
}

/// Pieces of one length consumed by internal-fab assemblies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalFabCut {
    pub count: f64,
    pub piece_qty: f64,
    pub unit: String,
}

/// One unique part of the flat BOM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub part_id: PartId,
    pub ipn: String,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub is_assembly: bool,
    pub purchaseable: bool,
    pub active: bool,
    pub default_supplier: Option<SupplierId>,
    pub category: CategoryTag,
    pub total_qty: f64,
    /// Notes of every contributing BOM line, comma separated
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_list: Option<Vec<CutListEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_fab_cut_list: Option<Vec<InternalFabCut>>,
    pub assembly_no_children: bool,
    pub max_depth_exceeded: bool,
}

impl AggregateRow {
    fn first_seen(leaf: &LeafRecord) -> Self {
        Self {
            part_id: leaf.part_id,
            ipn: leaf.ipn.clone(),
            name: leaf.name.clone(),
            description: leaf.description.clone(),
            unit: leaf.unit.clone(),
            is_assembly: leaf.is_assembly,
            purchaseable: leaf.purchaseable,
            active: leaf.active,
            default_supplier: leaf.default_supplier,
            category: leaf.category,
            total_qty: 0.0,
            reference: String::new(),
            cut_list: None,
            internal_fab_cut_list: None,
            assembly_no_children: false,
            max_depth_exceeded: false,
        }
    }

    fn add_cut(&mut self, quantity: f64, length: f64) {
        let list = self.cut_list.get_or_insert_with(Vec::new);
        match list.iter_mut().find(|e| e.length == length) {
            Some(entry) => entry.quantity += quantity,
            None => list.push(CutListEntry { quantity, length }),
        }
    }

    fn add_internal_fab_cut(&mut self, count: f64, piece_qty: f64, unit: &str) {
        let list = self.internal_fab_cut_list.get_or_insert_with(Vec::new);
        match list
            .iter_mut()
            .find(|e| e.piece_qty == piece_qty && e.unit == unit)
        {
            Some(entry) => entry.count += count,
            None => list.push(InternalFabCut {
                count,
                piece_qty,
                unit: unit.to_string(),
            }),
        }
    }
}

/// Pieces cut per internal-fab occurrence; the edge quantity is the piece length
const INTERNAL_FAB_PIECES: f64 = 1.0;

/// Settings that change how quantities are summed
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions<'a> {
    /// Build internal-fab cut lists
    pub enable_internal_fab_cuts: bool,
    /// Lower-case units eligible for internal-fab cut lists
    pub allowed_units: &'a BTreeSet<String>,
}

/// Group leaf records by part and sum their quantities, sorted by IPN
///
/// Per record, exactly one rule applies:
/// - cut-to-length with a length: `cumulative_qty * cut_length`, plus a cut-list entry
/// - internal-fab stock with a length and an allowed unit (when enabled):
///   `cut_length` per occurrence, plus an internal-fab cut entry
/// - anything else: `cumulative_qty`
pub fn aggregate(leaves: &[LeafRecord], options: AggregateOptions<'_>) -> Vec<AggregateRow> {
    let mut rows: Vec<AggregateRow> = Vec::new();
    let mut index: HashMap<PartId, usize> = HashMap::new();
    let mut notes: Vec<Vec<&str>> = Vec::new();

    for leaf in leaves {
        let slot = *index.entry(leaf.part_id).or_insert_with(|| {
            rows.push(AggregateRow::first_seen(leaf));
            notes.push(Vec::new());
            rows.len() - 1
        });
        let row = &mut rows[slot];

        match (leaf.category, leaf.cut_length) {
            (CategoryTag::CtL, Some(length)) => {
                row.total_qty += leaf.cumulative_qty * length;
                row.add_cut(leaf.cumulative_qty, length);
            }
            (_, Some(length))
                if leaf.from_internal_fab_parent
                    && options.enable_internal_fab_cuts
                    && options.allowed_units.contains(&leaf.unit.to_lowercase()) =>
            {
                row.total_qty += length * INTERNAL_FAB_PIECES;
                row.add_internal_fab_cut(INTERNAL_FAB_PIECES, length, &leaf.unit);
            }
            _ => row.total_qty += leaf.cumulative_qty,
        }

        row.assembly_no_children |= leaf.assembly_no_children;
        row.max_depth_exceeded |= leaf.max_depth_exceeded;

        if !leaf.note.is_empty() {
            notes[slot].push(&leaf.note);
        }
    }

    for (row, row_notes) in rows.iter_mut().zip(&notes) {
        row.reference = row_notes.join(", ");
    }

    rows.sort_by(|a, b| a.ipn.cmp(&b.ipn));
    rows
}
