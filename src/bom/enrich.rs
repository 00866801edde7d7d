//! Stock figures and shortfall for flat BOM rows

use serde::Serialize;

use crate::bom::aggregate::AggregateRow;
use crate::core::store::{BomSource, StoreError};

/// Which stock figures count toward availability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortfallOptions {
    /// Number of top-level assemblies to build
    pub build_qty: f64,
    /// Subtract stock already allocated elsewhere
    pub include_allocations: bool,
    /// Count open purchase orders as available
    pub include_on_order: bool,
}

impl Default for ShortfallOptions {
    fn default() -> Self {
        Self {
            build_qty: 1.0,
            include_allocations: false,
            include_on_order: false,
        }
    }
}

/// An aggregate row joined with live stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    #[serde(flatten)]
    pub row: AggregateRow,
    pub in_stock: f64,
    pub allocated: f64,
    pub on_order: f64,
    pub total_required: f64,
    pub shortfall: f64,
}

/// `max(0, required - available)`, never negative
pub fn shortfall(
    total_qty: f64,
    in_stock: f64,
    allocated: f64,
    on_order: f64,
    options: &ShortfallOptions,
) -> f64 {
    let required = total_qty * options.build_qty;
    let mut available = in_stock;
    if options.include_allocations {
        available -= allocated;
    }
    if options.include_on_order {
        available += on_order;
    }
    (required - available).max(0.0)
}

/// Join each row with the stock recorded on its part
///
/// Parts without stock figures count as zero on hand.
pub fn enrich<S: BomSource + ?Sized>(
    source: &S,
    rows: Vec<AggregateRow>,
    options: &ShortfallOptions,
) -> Result<Vec<EnrichedRow>, StoreError> {
    let mut enriched = Vec::with_capacity(rows.len());

    for row in rows {
        let stock = match source.part(row.part_id)? {
            Some(part) => part.stock.unwrap_or_default(),
            None => {
                tracing::warn!(part_id = %row.part_id, "part not found during enrichment");
                Default::default()
            }
        };
        let total_required = row.total_qty * options.build_qty;
        let short = shortfall(
            row.total_qty,
            stock.in_stock,
            stock.allocated,
            stock.on_order,
            options,
        );
        enriched.push(EnrichedRow {
            row,
            in_stock: stock.in_stock,
            allocated: stock.allocated,
            on_order: stock.on_order,
            total_required,
            shortfall: short,
        });
    }

    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::categorize::CategoryTag;
    use crate::core::identity::PartId;
    use crate::core::store::PartStore;
    use crate::entities::{Part, StockLevels};

    #[test]
    fn test_shortfall_toggles() {
        let base = ShortfallOptions {
            build_qty: 2.0,
            ..Default::default()
        };
        // need 20, have 15
        assert_eq!(shortfall(10.0, 15.0, 4.0, 3.0, &base), 5.0);

        let alloc = ShortfallOptions {
            include_allocations: true,
            ..base
        };
        assert_eq!(shortfall(10.0, 15.0, 4.0, 3.0, &alloc), 9.0);

        let both = ShortfallOptions {
            include_on_order: true,
            ..alloc
        };
        assert_eq!(shortfall(10.0, 15.0, 4.0, 3.0, &both), 6.0);
    }

    #[test]
    fn test_shortfall_never_negative() {
        assert_eq!(shortfall(1.0, 50.0, 0.0, 0.0, &ShortfallOptions::default()), 0.0);
        assert_eq!(shortfall(-3.0, 0.0, 0.0, 0.0, &ShortfallOptions::default()), 0.0);
    }

    #[test]
    fn test_enrich_reads_stock() {
        let mut bolt = Part::new(2, "BLT", "Bolt");
        bolt.stock = Some(StockLevels {
            in_stock: 3.0,
            allocated: 1.0,
            on_order: 10.0,
        });
        let store = PartStore::new().with_part(bolt).with_part(Part::new(3, "NUT", "Nut"));

        let row = |id: u64, ipn: &str| AggregateRow {
            part_id: PartId(id),
            ipn: ipn.to_string(),
            name: String::new(),
            description: String::new(),
            unit: String::new(),
            is_assembly: false,
            purchaseable: true,
            active: true,
            default_supplier: None,
            category: CategoryTag::Coml,
            total_qty: 4.0,
            reference: String::new(),
            cut_list: None,
            internal_fab_cut_list: None,
            assembly_no_children: false,
            max_depth_exceeded: false,
        };

        let rows = enrich(
            &store,
            vec![row(2, "BLT"), row(3, "NUT")],
            &ShortfallOptions::default(),
        )
        .unwrap();

        assert_eq!(rows[0].in_stock, 3.0);
        assert_eq!(rows[0].shortfall, 1.0);
        assert_eq!(rows[1].in_stock, 0.0);
        assert_eq!(rows[1].shortfall, 4.0);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["ipn"], "BLT");
        assert_eq!(json["shortfall"], 1.0);
    }
}
