//! Property tests over randomly generated acyclic BOMs

use proptest::prelude::*;

use super::*;
use crate::core::store::PartStore;
use crate::entities::{BomItem, Part};

/// Parts 1..=n where part i may only use parts with a higher id, so the graph
/// is acyclic. Edge quantities are small integers to keep products exact.
fn arb_store(max_parts: usize) -> impl Strategy<Value = PartStore> {
    (2..=max_parts).prop_flat_map(|n| {
        let edges = prop::collection::vec((1..=n as u64, 1..=n as u64, 1u32..=4), 0..n * 2);
        edges.prop_map(move |edges| {
            let mut parts: Vec<Part> = (1..=n as u64)
                .map(|id| Part::new(id, format!("P-{id:03}"), format!("Part {id}")))
                .collect();
            for (a, b, qty) in edges {
                let (parent, child) = if a < b { (a, b) } else if b < a { (b, a) } else { continue };
                let part = &mut parts[(parent - 1) as usize];
                part.assembly = true;
                part.add_item(BomItem::new(PartId(child), f64::from(qty)));
            }
            parts.into_iter().fold(PartStore::new(), PartStore::with_part)
        })
    })
}

fn check_cumulative(node: &TreeNode) -> Result<(), TestCaseError> {
    for child in &node.children {
        prop_assert_eq!(child.cumulative_qty, node.cumulative_qty * child.quantity);
        check_cumulative(child)?;
    }
    Ok(())
}

proptest! {
    /// Cumulative quantity is the product of edge quantities along the path
    #[test]
    fn cumulative_quantity_is_path_product(store in arb_store(8)) {
        let (tree, _) = build_tree(&store, PartId(1), &FlattenOptions::default()).unwrap();
        prop_assert_eq!(tree.cumulative_qty, 1.0);
        check_cumulative(&tree)?;
    }

    /// Flattening the same data twice gives the same rows in the same order
    #[test]
    fn flatten_is_deterministic(store in arb_store(8)) {
        let options = FlattenOptions::default();
        let first = flatten_bom(&store, PartId(1), &options).unwrap();
        let second = flatten_bom(&store, PartId(1), &options).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Without cut lists every leaf occurrence adds its cumulative quantity once
    #[test]
    fn totals_sum_leaf_quantities(store in arb_store(8)) {
        let options = FlattenOptions::default();
        let (tree, _) = build_tree(&store, PartId(1), &options).unwrap();
        let leaves = flatten(&tree, false);
        let bom = flatten_bom(&store, PartId(1), &options).unwrap();

        let from_leaves: f64 = leaves.iter().map(|l| l.cumulative_qty).sum();
        let from_rows: f64 = bom.rows.iter().map(|r| r.total_qty).sum();
        prop_assert!((from_leaves - from_rows).abs() < 1e-6);
        prop_assert!(bom.rows.windows(2).all(|w| w[0].ipn <= w[1].ipn));
    }
}
