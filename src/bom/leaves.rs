//! Leaf selection: which tree nodes are things to buy or cut

use serde::Serialize;

use crate::bom::categorize::CategoryTag;
use crate::bom::length::extract_length;
use crate::bom::traverse::{ParentRef, TreeNode};
use crate::core::identity::{PartId, SupplierId};

/// One leaf occurrence; a part reached through several paths yields several records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafRecord {
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
    pub level: usize,
    pub parent_ipn: Option<String>,
    pub cumulative_qty: f64,
    pub quantity: f64,
    pub reference: String,
    pub note: String,
    pub cut_length: Option<f64>,
    pub from_internal_fab_parent: bool,
    pub internal_fab_parent: Option<ParentRef>,
    /// Assembly with an empty BOM (not a depth truncation)
    pub assembly_no_children: bool,
    pub max_depth_exceeded: bool,
}

impl LeafRecord {
    fn from_node(node: &TreeNode, cut_length: Option<f64>, assembly_no_children: bool) -> Self {
        Self {
            part_id: node.part_id,
            ipn: node.ipn.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            unit: node.unit.clone(),
            is_assembly: node.is_assembly,
            purchaseable: node.purchaseable,
            active: node.active,
            default_supplier: node.default_supplier,
            category: node.category,
            level: node.level,
            parent_ipn: node.parent_ipn.clone(),
            cumulative_qty: node.cumulative_qty,
            quantity: node.quantity,
            reference: node.reference.clone(),
            note: node.note.clone(),
            cut_length,
            from_internal_fab_parent: node.from_internal_fab_parent,
            internal_fab_parent: node.internal_fab_parent.clone(),
            assembly_no_children,
            max_depth_exceeded: node.max_depth_exceeded,
        }
    }
}

/// Collect leaf records in pre-order
pub fn flatten(tree: &TreeNode, expand_purchased_assemblies: bool) -> Vec<LeafRecord> {
    let mut leaves = Vec::new();
    collect(tree, expand_purchased_assemblies, &mut leaves);
    leaves
}

fn collect(node: &TreeNode, expand_purchased: bool, leaves: &mut Vec<LeafRecord>) {
    if node.category.is_stock_item() {
        let cut_length = if node.from_internal_fab_parent {
            node.cut_length
        } else if node.category == CategoryTag::CtL {
            extract_length(&node.note)
        } else {
            None
        };
        leaves.push(LeafRecord::from_node(node, cut_length, false));
        return;
    }

    if node.category == CategoryTag::PurchasedAssy && !expand_purchased {
        leaves.push(LeafRecord::from_node(node, None, false));
        return;
    }

    if !node.is_assembly {
        leaves.push(LeafRecord::from_node(node, None, false));
        return;
    }

    if node.children.is_empty() {
        leaves.push(LeafRecord::from_node(node, None, !node.max_depth_exceeded));
        return;
    }

    for child in &node.children {
        collect(child, expand_purchased, leaves);
    }
}
