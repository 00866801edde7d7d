//! Flat BOM generation
//!
//! A flat BOM is built in three passes over data read through a
//! [`BomSource`](crate::core::store::BomSource):
//!
//! 1. [`traverse`] walks the BOM from a root part into an annotated tree,
//!    calling [`categorize`] once per node.
//! 2. [`leaves`] picks the nodes that are bought or cut rather than expanded.
//! 3. [`aggregate`] merges leaves of the same part, summing quantities and
//!    building cut lists.
//!
//! [`flatten_bom`] runs all three and collects the advisory [`warnings`].

pub mod aggregate;
pub mod categorize;
pub mod enrich;
pub mod leaves;
pub mod length;
pub mod settings;
pub mod traverse;
pub mod warnings;

#[cfg(test)]
mod properties;

use std::collections::BTreeSet;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

pub use aggregate::{aggregate, AggregateOptions, AggregateRow, CutListEntry, InternalFabCut};
pub use categorize::{categorize, CategoryMappings, CategoryTag, MappingKind};
pub use leaves::{flatten, LeafRecord};
pub use traverse::{build_tree, TraversalStats, TreeNode};
pub use warnings::{Warning, WarningKind};

use crate::core::config::DEFAULT_INTERNAL_FAB_UNITS;
use crate::core::identity::{PartId, SupplierId};
use crate::core::store::{BomSource, StoreError};

/// Conditions that abort flat BOM generation
#[derive(Debug, Error, Diagnostic)]
pub enum BomError {
    #[error("part {part_id} not found")]
    #[diagnostic(
        code(flatbom::bom::part_not_found),
        help("Check the part id; part files live under parts/.")
    )]
    PartNotFound { part_id: PartId },

    #[error("circular BOM reference at part {ipn} (id {part_id}) on level {level}")]
    #[diagnostic(
        code(flatbom::bom::cycle),
        help("An assembly contains itself somewhere below. Fix the BOM so no part is its own ancestor.")
    )]
    CycleDetected {
        part_id: PartId,
        ipn: String,
        level: usize,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Everything that shapes a flattening run
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenOptions {
    /// Do not expand assemblies at or below this level
    pub max_depth: Option<usize>,
    pub expand_purchased_assemblies: bool,
    pub internal_suppliers: BTreeSet<SupplierId>,
    pub category_mappings: CategoryMappings,
    pub enable_internal_fab_cuts: bool,
    /// Lower-case units eligible for internal-fab cut lists
    pub internal_fab_units: BTreeSet<String>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            expand_purchased_assemblies: false,
            internal_suppliers: BTreeSet::new(),
            category_mappings: CategoryMappings::default(),
            enable_internal_fab_cuts: false,
            internal_fab_units: settings::parse_units(DEFAULT_INTERNAL_FAB_UNITS),
        }
    }
}

/// Result of [`flatten_bom`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatBom {
    pub part_id: PartId,
    pub ipn: String,
    pub part_name: String,
    pub rows: Vec<AggregateRow>,
    /// Nodes categorized "Internal Fab" during traversal
    pub internal_fab_count: usize,
    pub max_depth_reached: usize,
    /// Leaf occurrences before deduplication
    pub leaf_count: usize,
    pub warnings: Vec<Warning>,
}

impl FlatBom {
    pub fn unit_mismatch_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings
            .iter()
            .filter(|w| w.kind == WarningKind::UnitMismatch)
    }
}

/// Flatten the BOM of `root_id` into one row per purchasable or cut part
pub fn flatten_bom<S: BomSource + ?Sized>(
    source: &S,
    root_id: PartId,
    options: &FlattenOptions,
) -> Result<FlatBom, BomError> {
    let (tree, stats) = build_tree(source, root_id, options)?;

    let leaves = flatten(&tree, options.expand_purchased_assemblies);
    tracing::info!(
        leaves = leaves.len(),
        expand_purchased = options.expand_purchased_assemblies,
        "collected leaf part instances"
    );

    let rows = aggregate(
        &leaves,
        AggregateOptions {
            enable_internal_fab_cuts: options.enable_internal_fab_cuts,
            allowed_units: &options.internal_fab_units,
        },
    );

    let mut warnings = warnings::unit_mismatch_warnings(&leaves);
    warnings.extend(warnings::row_warnings(&rows, stats.max_depth_reached));

    tracing::info!(
        unique_parts = rows.len(),
        internal_fab = stats.internal_fab_count,
        max_depth_reached = stats.max_depth_reached,
        warnings = warnings.len(),
        "flat BOM complete"
    );

    Ok(FlatBom {
        part_id: tree.part_id,
        ipn: tree.ipn,
        part_name: tree.name,
        rows,
        internal_fab_count: stats.internal_fab_count,
        max_depth_reached: stats.max_depth_reached,
        leaf_count: leaves.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::CategoryId;
    use crate::core::store::PartStore;
    use crate::entities::{BomItem, Category, Part, Supplier};

    const FAB: u64 = 5;
    const COML: u64 = 8;
    const CTL: u64 = 20;

    fn options() -> FlattenOptions {
        FlattenOptions {
            internal_suppliers: BTreeSet::from([SupplierId(1)]),
            category_mappings: CategoryMappings::new()
                .with(MappingKind::Fabrication, [CategoryId(FAB)])
                .with(MappingKind::Commercial, [CategoryId(COML)])
                .with(MappingKind::CutToLength, [CategoryId(CTL)]),
            ..FlattenOptions::default()
        }
    }

    /// Robot
    /// ├── 2x Arm (assembly)
    /// │   ├── 4x Screw
    /// │   └── 1x Tube "350mm"
    /// ├── 1x Base (assembly)
    /// │   ├── 6x Screw
    /// │   └── 2x Tube "12 in"
    /// ├── 1x Gearbox (purchased assembly)
    /// │   └── 3x Gear
    /// └── 1x Weldment (internal fab)
    ///     └── 35 mm Flat bar
    fn robot() -> PartStore {
        PartStore::new()
            .with_supplier(Supplier::new(1, "In-house"))
            .with_supplier(Supplier::new(9, "Gears Inc"))
            .with_category(Category::new(FAB, "Fabrication", None))
            .with_category(Category::new(COML, "Commercial", None))
            .with_category(Category::new(CTL, "Stock", None))
            .with_part(
                Part::new(1, "TLA-001", "Robot")
                    .as_assembly()
                    .with_item(BomItem::new(PartId(2), 2.0))
                    .with_item(BomItem::new(PartId(3), 1.0))
                    .with_item(BomItem::new(PartId(6), 1.0))
                    .with_item(BomItem::new(PartId(8), 1.0)),
            )
            .with_part(
                Part::new(2, "ASM-ARM", "Arm")
                    .as_assembly()
                    .with_item(BomItem::new(PartId(4), 4.0).with_note("S1-S4"))
                    .with_item(BomItem::new(PartId(5), 1.0).with_note("350mm")),
            )
            .with_part(
                Part::new(3, "ASM-BASE", "Base")
                    .as_assembly()
                    .with_item(BomItem::new(PartId(4), 6.0).with_note("S5-S10"))
                    .with_item(BomItem::new(PartId(5), 2.0).with_note("12 in")),
            )
            .with_part(Part::new(4, "SCR-M3", "Screw").with_category(COML))
            .with_part(
                Part::new(5, "TUB-20", "Tube")
                    .with_category(CTL)
                    .with_units("mm"),
            )
            .with_part(
                Part::new(6, "GBX-1", "Gearbox")
                    .as_assembly()
                    .with_supplier(9)
                    .with_item(BomItem::new(PartId(7), 3.0)),
            )
            .with_part(Part::new(7, "GR-1", "Gear").with_category(COML))
            .with_part(
                Part::new(8, "WLD-1", "Weldment")
                    .as_assembly()
                    .with_category(FAB)
                    .with_supplier(1)
                    .with_item(BomItem::new(PartId(9), 35.0)),
            )
            .with_part(
                Part::new(9, "BAR-10", "Flat bar")
                    .with_category(COML)
                    .with_units("mm"),
            )
    }

    fn row<'a>(bom: &'a FlatBom, ipn: &str) -> &'a AggregateRow {
        bom.rows.iter().find(|r| r.ipn == ipn).unwrap()
    }

    #[test]
    fn test_flatten_robot() {
        let bom = flatten_bom(&robot(), PartId(1), &options()).unwrap();

        let ipns: Vec<_> = bom.rows.iter().map(|r| r.ipn.as_str()).collect();
        assert_eq!(ipns, vec!["BAR-10", "GBX-1", "SCR-M3", "TUB-20"]);

        // 2 arms x 4 + 1 base x 6
        let screw = row(&bom, "SCR-M3");
        assert_eq!(screw.total_qty, 14.0);
        assert_eq!(screw.reference, "S1-S4, S5-S10");

        // 2 x 350 + 2 x 12
        let tube = row(&bom, "TUB-20");
        assert_eq!(tube.category, CategoryTag::CtL);
        assert_eq!(tube.total_qty, 724.0);
        assert_eq!(tube.cut_list.as_ref().unwrap().len(), 2);

        assert_eq!(row(&bom, "GBX-1").category, CategoryTag::PurchasedAssy);
        assert_eq!(bom.internal_fab_count, 1);
        assert_eq!(bom.max_depth_reached, 2);
        assert_eq!(bom.leaf_count, 6);
    }

    #[test]
    fn test_unit_mismatch_is_reported() {
        let bom = flatten_bom(&robot(), PartId(1), &options()).unwrap();
        let mismatches: Vec<_> = bom.unit_mismatch_warnings().collect();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].part_id, Some(PartId(5)));
        assert_eq!(
            mismatches[0].message,
            "BOM notes specify 'in' but part uses 'mm'"
        );
    }

    #[test]
    fn test_internal_fab_cut_lists_only_when_enabled() {
        let bom = flatten_bom(&robot(), PartId(1), &options()).unwrap();
        let bar = row(&bom, "BAR-10");
        assert_eq!(bar.total_qty, 35.0);
        assert!(bar.internal_fab_cut_list.is_none());

        let enabled = FlattenOptions {
            enable_internal_fab_cuts: true,
            ..options()
        };
        let bom = flatten_bom(&robot(), PartId(1), &enabled).unwrap();
        let bar = row(&bom, "BAR-10");
        assert_eq!(bar.total_qty, 35.0);
        assert_eq!(
            bar.internal_fab_cut_list,
            Some(vec![InternalFabCut {
                count: 1.0,
                piece_qty: 35.0,
                unit: "mm".to_string()
            }])
        );
    }

    #[test]
    fn test_expand_purchased_toggle() {
        let expanded = FlattenOptions {
            expand_purchased_assemblies: true,
            ..options()
        };
        let bom = flatten_bom(&robot(), PartId(1), &expanded).unwrap();
        assert!(bom.rows.iter().all(|r| r.ipn != "GBX-1"));
        assert_eq!(row(&bom, "GR-1").total_qty, 3.0);
    }

    #[test]
    fn test_max_depth_summary_warning() {
        let shallow = FlattenOptions {
            max_depth: Some(1),
            ..options()
        };
        let bom = flatten_bom(&robot(), PartId(1), &shallow).unwrap();

        let arm = row(&bom, "ASM-ARM");
        assert!(arm.max_depth_exceeded);
        assert!(!arm.assembly_no_children);
        assert_eq!(arm.total_qty, 2.0);

        let summaries: Vec<_> = bom
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::MaxDepthReached)
            .collect();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].part_id.is_none());
    }

    #[test]
    fn test_runs_are_identical() {
        let store = robot();
        let first = flatten_bom(&store, PartId(1), &options()).unwrap();
        let second = flatten_bom(&store, PartId(1), &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_configuration_still_flattens() {
        let bom = flatten_bom(&robot(), PartId(1), &FlattenOptions::default()).unwrap();
        assert!(bom
            .rows
            .iter()
            .filter(|r| !r.is_assembly)
            .all(|r| r.category == CategoryTag::Other));
        assert_eq!(bom.internal_fab_count, 0);
    }

    #[test]
    fn test_part_not_found() {
        let err = flatten_bom(&robot(), PartId(404), &options()).unwrap_err();
        assert!(matches!(err, BomError::PartNotFound { .. }));
        assert_eq!(err.to_string(), "part 404 not found");
    }
}
