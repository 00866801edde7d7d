//! Recursive BOM traversal
//!
//! Builds an annotated tree from a root part. Every occurrence of a part gets
//! its own [`TreeNode`], so a screw used in two sub-assemblies appears twice.
//! Cycle detection uses the set of ancestors on the current path only; that set
//! is cloned per branch so reuse across branches is never mistaken for a cycle.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::bom::categorize::{categorize, CategoryMappings, CategoryTag};
use crate::bom::{BomError, FlattenOptions};
use crate::core::identity::{PartId, SupplierId};
use crate::core::store::{BomLine, BomSource};
use crate::entities::Part;

/// The "Internal Fab" assembly a raw-stock child was consumed by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentRef {
    pub part_id: PartId,
    pub ipn: String,
}

/// One occurrence of a part in the traversed BOM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
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
    /// Product of all edge quantities from the root down to this node
    pub cumulative_qty: f64,

    /// Quantity on the BOM line that led here (1 for the root)
    pub quantity: f64,
    pub reference: String,
    pub note: String,

    pub children: Vec<TreeNode>,

    /// Assembly whose BOM was not expanded because of the depth limit
    pub max_depth_exceeded: bool,
    /// Immediate parent is an "Internal Fab" assembly
    pub from_internal_fab_parent: bool,
    pub internal_fab_parent: Option<ParentRef>,
    /// Piece length in the part's own unit (internal-fab children only)
    pub cut_length: Option<f64>,
}

impl TreeNode {
    fn new(part: &Part, category: CategoryTag, pos: &Position<'_>) -> Self {
        Self {
            part_id: part.id,
            ipn: part.ipn.clone(),
            name: part.name.clone(),
            description: part.description.clone(),
            unit: part.units.clone(),
            is_assembly: part.assembly,
            purchaseable: part.purchaseable,
            active: part.active,
            default_supplier: part.default_supplier,
            category,
            level: pos.level,
            parent_ipn: pos.parent_ipn.map(str::to_string),
            cumulative_qty: pos.cumulative_qty,
            quantity: 1.0,
            reference: String::new(),
            note: String::new(),
            children: Vec::new(),
            max_depth_exceeded: false,
            from_internal_fab_parent: false,
            internal_fab_parent: None,
            cut_length: None,
        }
    }

    /// Copy of this node carrying the path-specific data of the line that reached it
    pub fn with_edge(self, line: &BomLine) -> Self {
        Self {
            quantity: line.quantity,
            reference: line.reference.clone(),
            note: line.note.clone(),
            ..self
        }
    }

    /// Copy of this node marked as raw stock consumed by an internal-fab parent
    ///
    /// The edge quantity is a piece length in the child's unit, not a count.
    pub fn consumed_by(self, parent: ParentRef, piece_length: f64) -> Self {
        Self {
            from_internal_fab_parent: true,
            internal_fab_parent: Some(parent),
            cut_length: Some(piece_length),
            ..self
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Counters shared by the whole traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    /// Nodes categorized "Internal Fab"
    pub internal_fab_count: usize,
    /// Deepest level visited (root is 0)
    pub max_depth_reached: usize,
    /// BOM reads issued against the data source
    pub bom_queries: usize,
}

/// Where a node sits in the tree
struct Position<'a> {
    level: usize,
    cumulative_qty: f64,
    parent_ipn: Option<&'a str>,
    /// Note of the BOM line that reached this node
    note: &'a str,
}

struct Traverser<'a, S: BomSource + ?Sized> {
    source: &'a S,
    max_depth: Option<usize>,
    internal_suppliers: &'a BTreeSet<SupplierId>,
    mappings: &'a CategoryMappings,
    stats: TraversalStats,
}

impl<'a, S: BomSource + ?Sized> Traverser<'a, S> {
    fn visit(
        &mut self,
        part: &Part,
        pos: Position<'_>,
        ancestors: &HashSet<PartId>,
    ) -> Result<TreeNode, BomError> {
        if ancestors.contains(&part.id) {
            tracing::warn!(
                part_id = %part.id,
                ipn = %part.ipn,
                level = pos.level,
                "circular BOM reference"
            );
            return Err(BomError::CycleDetected {
                part_id: part.id,
                ipn: part.ipn.clone(),
                level: pos.level,
            });
        }

        let mut path = ancestors.clone();
        path.insert(part.id);

        let category = categorize(
            part,
            pos.level == 0,
            self.internal_suppliers,
            self.mappings,
            pos.note,
        );
        if category == CategoryTag::InternalFab {
            self.stats.internal_fab_count += 1;
        }
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(pos.level);

        let mut node = TreeNode::new(part, category, &pos);

        if self.max_depth.is_some_and(|max| pos.level >= max) {
            if part.assembly {
                tracing::debug!(ipn = %part.ipn, level = pos.level, "max depth reached, not expanding");
                node.max_depth_exceeded = true;
            }
            return Ok(node);
        }

        if !part.assembly {
            return Ok(node);
        }

        self.stats.bom_queries += 1;
        for line in self.source.bom_lines(part.id)? {
            let child_pos = Position {
                level: pos.level + 1,
                cumulative_qty: pos.cumulative_qty * line.quantity,
                parent_ipn: Some(part.ipn.as_str()),
                note: &line.note,
            };
            let mut child = self.visit(&line.sub_part, child_pos, &path)?.with_edge(&line);

            if category == CategoryTag::InternalFab
                && matches!(child.category, CategoryTag::Fab | CategoryTag::Coml)
            {
                let parent = ParentRef {
                    part_id: part.id,
                    ipn: part.ipn.clone(),
                };
                child = child.consumed_by(parent, line.quantity);
            }

            node.children.push(child);
        }

        Ok(node)
    }
}

/// Traverse the BOM below an already-fetched root part
pub fn traverse<S: BomSource + ?Sized>(
    source: &S,
    root: &Part,
    options: &FlattenOptions,
) -> Result<(TreeNode, TraversalStats), BomError> {
    let mut traverser = Traverser {
        source,
        max_depth: options.max_depth,
        internal_suppliers: &options.internal_suppliers,
        mappings: &options.category_mappings,
        stats: TraversalStats::default(),
    };

    let root_pos = Position {
        level: 0,
        cumulative_qty: 1.0,
        parent_ipn: None,
        note: "",
    };
    let tree = traverser.visit(root, root_pos, &HashSet::new())?;
    Ok((tree, traverser.stats))
}

/// Fetch `root_id` and traverse its BOM
pub fn build_tree<S: BomSource + ?Sized>(
    source: &S,
    root_id: PartId,
    options: &FlattenOptions,
) -> Result<(TreeNode, TraversalStats), BomError> {
    let root = source
        .part(root_id)?
        .ok_or(BomError::PartNotFound { part_id: root_id })?;
    tracing::info!(part_id = %root_id, ipn = %root.ipn, "traversing BOM");
    traverse(source, &root, options)
}
