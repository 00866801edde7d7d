//! Advisory warnings attached to a flat BOM

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::bom::aggregate::AggregateRow;
use crate::bom::categorize::CategoryTag;
use crate::bom::leaves::LeafRecord;
use crate::bom::length::check_unit_mismatch;
use crate::core::identity::PartId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Unit written in a cut-to-length note differs from the part's unit
    UnitMismatch,
    InactivePart,
    /// Assembly with no BOM lines
    AssemblyNoChildren,
    /// Depth limit stopped expansion somewhere
    MaxDepthReached,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::UnitMismatch => "unit_mismatch",
            WarningKind::InactivePart => "inactive_part",
            WarningKind::AssemblyNoChildren => "assembly_no_children",
            WarningKind::MaxDepthReached => "max_depth_reached",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    /// `None` for summary warnings
    pub part_id: Option<PartId>,
    pub part_name: String,
    pub message: String,
}

impl Warning {
    fn for_part(kind: WarningKind, part_id: PartId, part_name: &str, message: String) -> Self {
        Self {
            kind,
            part_id: Some(part_id),
            part_name: part_name.to_string(),
            message,
        }
    }
}

/// One warning per unique (part, note) of cut-to-length records whose note unit disagrees
pub fn unit_mismatch_warnings(leaves: &[LeafRecord]) -> Vec<Warning> {
    let mut seen: HashSet<(PartId, &str)> = HashSet::new();
    let mut warnings = Vec::new();

    for leaf in leaves {
        if leaf.category != CategoryTag::CtL || leaf.note.is_empty() {
            continue;
        }
        if !seen.insert((leaf.part_id, leaf.note.as_str())) {
            continue;
        }
        if let Some(message) = check_unit_mismatch(&leaf.note, &leaf.unit) {
            warnings.push(Warning::for_part(
                WarningKind::UnitMismatch,
                leaf.part_id,
                &leaf.name,
                message,
            ));
        }
    }

    warnings
}

/// Per-row warnings followed by the depth summary, if any row was truncated
pub fn row_warnings(rows: &[AggregateRow], max_depth_reached: usize) -> Vec<Warning> {
    let mut warnings = Vec::new();

    for row in rows {
        if !row.active {
            warnings.push(Warning::for_part(
                WarningKind::InactivePart,
                row.part_id,
                &row.name,
                format!("Part {} is inactive", display_ipn(row)),
            ));
        }
        if row.assembly_no_children {
            warnings.push(Warning::for_part(
                WarningKind::AssemblyNoChildren,
                row.part_id,
                &row.name,
                format!(
                    "Assembly {} has no BOM items defined",
                    display_ipn(row)
                ),
            ));
        }
    }

    let truncated = rows.iter().filter(|r| r.max_depth_exceeded).count();
    if truncated > 0 {
        warnings.push(Warning {
            kind: WarningKind::MaxDepthReached,
            part_id: None,
            part_name: "Multiple assemblies".to_string(),
            message: format!(
                "BOM traversal stopped at depth {}. {} assemblies not fully expanded. \
                 Increase max_depth to see sub-components.",
                max_depth_reached, truncated
            ),
        });
    }

    warnings
}

fn display_ipn(row: &AggregateRow) -> &str {
    if row.ipn.is_empty() {
        &row.name
    } else {
        &row.ipn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctl_leaf(id: u64, note: &str, unit: &str) -> LeafRecord {
        LeafRecord {
            part_id: PartId(id),
            ipn: format!("BAR-{id}"),
            name: "Bar".to_string(),
            description: String::new(),
            unit: unit.to_string(),
            is_assembly: false,
            purchaseable: true,
            active: true,
            default_supplier: None,
            category: CategoryTag::CtL,
            level: 1,
            parent_ipn: None,
            cumulative_qty: 1.0,
            quantity: 1.0,
            reference: String::new(),
            note: note.to_string(),
            cut_length: None,
            from_internal_fab_parent: false,
            internal_fab_parent: None,
            assembly_no_children: false,
            max_depth_exceeded: false,
        }
    }

    fn row(id: u64, ipn: &str) -> AggregateRow {
        AggregateRow {
            part_id: PartId(id),
            ipn: ipn.to_string(),
            name: ipn.to_lowercase(),
            description: String::new(),
            unit: String::new(),
            is_assembly: true,
            purchaseable: false,
            active: true,
            default_supplier: None,
            category: CategoryTag::Assy,
            total_qty: 1.0,
            reference: String::new(),
            cut_list: None,
            internal_fab_cut_list: None,
            assembly_no_children: false,
            max_depth_exceeded: false,
        }
    }

    #[test]
    fn test_unit_mismatch_once_per_part_and_note() {
        let leaves = vec![
            ctl_leaf(1, "12 in", "mm"),
            ctl_leaf(1, "12 in", "mm"),
            ctl_leaf(1, "30 cm", "mm"),
            ctl_leaf(1, "300mm", "mm"),
            ctl_leaf(2, "12 in", "mm"),
        ];

        let warnings = unit_mismatch_warnings(&leaves);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::UnitMismatch));
        assert_eq!(warnings[0].part_id, Some(PartId(1)));
        assert_eq!(
            warnings[0].message,
            "BOM notes specify 'in' but part uses 'mm'"
        );
        assert_eq!(warnings[2].part_id, Some(PartId(2)));
    }

    #[test]
    fn test_non_ctl_records_are_not_checked() {
        let mut leaf = ctl_leaf(1, "12 in", "mm");
        leaf.category = CategoryTag::Fab;
        assert!(unit_mismatch_warnings(&[leaf]).is_empty());
    }

    #[test]
    fn test_row_warnings_and_single_depth_summary() {
        let mut inactive = row(1, "OLD");
        inactive.active = false;
        let mut empty = row(2, "EMPTY");
        empty.assembly_no_children = true;
        let mut deep_a = row(3, "DEEP-A");
        deep_a.max_depth_exceeded = true;
        let mut deep_b = row(4, "DEEP-B");
        deep_b.max_depth_exceeded = true;

        let warnings = row_warnings(&[inactive, empty, deep_a, deep_b], 2);
        let kinds: Vec<_> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::InactivePart,
                WarningKind::AssemblyNoChildren,
                WarningKind::MaxDepthReached
            ]
        );
        let summary = warnings.last().unwrap();
        assert!(summary.part_id.is_none());
        assert!(summary.message.contains("2 assemblies"));
    }

    #[test]
    fn test_warning_serializes_type_field() {
        let warnings = row_warnings(&[row(1, "A")], 0);
        assert!(warnings.is_empty());

        let mut r = row(1, "A");
        r.active = false;
        let json = serde_json::to_value(&row_warnings(&[r], 0)[0]).unwrap();
        assert_eq!(json["type"], "inactive_part");
        assert_eq!(json["part_id"], 1);
    }
}
