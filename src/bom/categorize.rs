//! Procurement categories for BOM nodes

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bom::length::extract_length;
use crate::core::identity::{CategoryId, SupplierId};
use crate::entities::Part;

/// Category tag assigned to every node of a traversed BOM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryTag {
    /// Top-level assembly (the root of the traversal)
    #[serde(rename = "TLA")]
    Tla,
    /// Assembly built in house from a fabrication category
    #[serde(rename = "Internal Fab")]
    InternalFab,
    /// Assembly bought complete from an outside supplier
    #[serde(rename = "Purchased Assy")]
    PurchasedAssy,
    /// Raw stock cut to a length given in the BOM note
    #[serde(rename = "CtL")]
    CtL,
    /// Commercial off-the-shelf part
    #[serde(rename = "Coml")]
    Coml,
    /// Fabricated part
    #[serde(rename = "Fab")]
    Fab,
    /// Any other assembly; always expanded
    #[serde(rename = "Assy")]
    Assy,
    #[serde(rename = "Other")]
    Other,
}

impl CategoryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryTag::Tla => "TLA",
            CategoryTag::InternalFab => "Internal Fab",
            CategoryTag::PurchasedAssy => "Purchased Assy",
            CategoryTag::CtL => "CtL",
            CategoryTag::Coml => "Coml",
            CategoryTag::Fab => "Fab",
            CategoryTag::Assy => "Assy",
            CategoryTag::Other => "Other",
        }
    }

    /// Coml, Fab and CtL nodes are bought or cut directly
    pub fn is_stock_item(&self) -> bool {
        matches!(self, CategoryTag::Coml | CategoryTag::Fab | CategoryTag::CtL)
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configurable category groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MappingKind {
    Fabrication,
    Commercial,
    CutToLength,
}

impl MappingKind {
    /// Key used in configuration files
    pub fn key(&self) -> &'static str {
        match self {
            MappingKind::Fabrication => "fabrication",
            MappingKind::Commercial => "commercial",
            MappingKind::CutToLength => "cut_to_length",
        }
    }

    pub fn all() -> &'static [MappingKind] {
        &[
            MappingKind::Fabrication,
            MappingKind::Commercial,
            MappingKind::CutToLength,
        ]
    }
}

impl FromStr for MappingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MappingKind::all()
            .iter()
            .copied()
            .find(|k| k.key() == s)
            .ok_or_else(|| format!("unknown category group '{}'", s))
    }
}

/// Category ids per group, each set already expanded to include descendants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMappings {
    sets: HashMap<MappingKind, HashSet<CategoryId>>,
}

impl CategoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: MappingKind, ids: impl IntoIterator<Item = CategoryId>) {
        self.sets.entry(kind).or_default().extend(ids);
    }

    /// Builder form of [`CategoryMappings::insert`]
    pub fn with(mut self, kind: MappingKind, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.insert(kind, ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn contains(&self, kind: MappingKind, id: CategoryId) -> bool {
        self.sets.get(&kind).is_some_and(|set| set.contains(&id))
    }

    /// Ids of one group in ascending order
    pub fn ids(&self, kind: MappingKind) -> Vec<CategoryId> {
        let mut ids: Vec<_> = self
            .sets
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

/// Classify one BOM node. The first matching rule wins:
///
/// 1. the root is always `TLA`
/// 2. an assembly in a fabrication category with an internal supplier is `Internal Fab`
/// 3. an assembly with any other supplier is `Purchased Assy`
/// 4. a non-assembly is classified by category: cut-to-length (only when the note
///    holds a length, otherwise `Fab`), then commercial, then fabrication
/// 5. any remaining assembly is `Assy`, everything else `Other`
pub fn categorize(
    part: &Part,
    is_top_level: bool,
    internal_suppliers: &BTreeSet<SupplierId>,
    mappings: &CategoryMappings,
    bom_item_notes: &str,
) -> CategoryTag {
    if is_top_level {
        return CategoryTag::Tla;
    }

    let is_internal = part
        .default_supplier
        .is_some_and(|s| internal_suppliers.contains(&s));

    if part.assembly {
        let in_fab = part
            .category
            .is_some_and(|c| mappings.contains(MappingKind::Fabrication, c));
        if in_fab && is_internal {
            return CategoryTag::InternalFab;
        }
        if part.default_supplier.is_some() && !is_internal {
            return CategoryTag::PurchasedAssy;
        }
        return CategoryTag::Assy;
    }

    if let Some(category) = part.category.filter(|_| !mappings.is_empty()) {
        if mappings.contains(MappingKind::CutToLength, category) {
            return match extract_length(bom_item_notes) {
                Some(_) => CategoryTag::CtL,
                None => CategoryTag::Fab,
            };
        }
        if mappings.contains(MappingKind::Commercial, category) {
            return CategoryTag::Coml;
        }
        if mappings.contains(MappingKind::Fabrication, category) {
            return CategoryTag::Fab;
        }
    }

    CategoryTag::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> CategoryMappings {
        CategoryMappings::new()
            .with(MappingKind::Fabrication, [CategoryId(5), CategoryId(12)])
            .with(MappingKind::Commercial, [CategoryId(8)])
            .with(MappingKind::CutToLength, [CategoryId(20)])
    }

    fn internal() -> BTreeSet<SupplierId> {
        BTreeSet::from([SupplierId(1)])
    }

    #[test]
    fn test_top_level_wins_over_everything() {
        let part = Part::new(1, "TLA-1", "Robot")
            .as_assembly()
            .with_category(5)
            .with_supplier(1);
        assert_eq!(
            categorize(&part, true, &internal(), &mappings(), "100"),
            CategoryTag::Tla
        );
    }

    #[test]
    fn test_internal_fab_vs_purchased_assembly() {
        let internal_asm = Part::new(2, "WLD-1", "Weldment")
            .as_assembly()
            .with_category(12)
            .with_supplier(1);
        assert_eq!(
            categorize(&internal_asm, false, &internal(), &mappings(), ""),
            CategoryTag::InternalFab
        );

        let bought = internal_asm.clone().with_supplier(9);
        assert_eq!(
            categorize(&bought, false, &internal(), &mappings(), ""),
            CategoryTag::PurchasedAssy
        );
    }

    #[test]
    fn test_plain_assembly() {
        let asm = Part::new(3, "ASM-1", "Frame").as_assembly().with_category(5);
        assert_eq!(
            categorize(&asm, false, &internal(), &mappings(), ""),
            CategoryTag::Assy
        );
        // Internal supplier without a fab category is still just an assembly
        let asm = Part::new(3, "ASM-1", "Frame").as_assembly().with_supplier(1);
        assert_eq!(
            categorize(&asm, false, &internal(), &mappings(), ""),
            CategoryTag::Assy
        );
    }

    #[test]
    fn test_leaf_categories() {
        let tube = Part::new(4, "TUB-1", "Tube").with_category(20);
        assert_eq!(
            categorize(&tube, false, &internal(), &mappings(), "350mm"),
            CategoryTag::CtL
        );
        assert_eq!(
            categorize(&tube, false, &internal(), &mappings(), "cut to fit"),
            CategoryTag::Fab
        );

        let screw = Part::new(5, "SCR-1", "Screw").with_category(8);
        assert_eq!(
            categorize(&screw, false, &internal(), &mappings(), ""),
            CategoryTag::Coml
        );

        let plate = Part::new(6, "PLT-1", "Plate").with_category(5);
        assert_eq!(
            categorize(&plate, false, &internal(), &mappings(), ""),
            CategoryTag::Fab
        );

        let misc = Part::new(7, "MSC-1", "Label").with_category(99);
        assert_eq!(
            categorize(&misc, false, &internal(), &mappings(), ""),
            CategoryTag::Other
        );
    }

    #[test]
    fn test_missing_configuration_degrades() {
        let none = CategoryMappings::new();
        let empty = BTreeSet::new();

        let screw = Part::new(5, "SCR-1", "Screw").with_category(8);
        assert_eq!(categorize(&screw, false, &empty, &none, ""), CategoryTag::Other);

        let asm = Part::new(3, "ASM-1", "Frame").as_assembly().with_category(5);
        assert_eq!(categorize(&asm, false, &empty, &none, ""), CategoryTag::Assy);

        let uncategorized = Part::new(8, "X-1", "Thing");
        assert_eq!(
            categorize(&uncategorized, false, &internal(), &mappings(), ""),
            CategoryTag::Other
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(CategoryTag::InternalFab.to_string(), "Internal Fab");
        assert_eq!(CategoryTag::PurchasedAssy.to_string(), "Purchased Assy");
        assert_eq!(
            serde_json::to_string(&CategoryTag::CtL).unwrap(),
            "\"CtL\""
        );
        assert_eq!("cut_to_length".parse::<MappingKind>(), Ok(MappingKind::CutToLength));
        assert!("bogus".parse::<MappingKind>().is_err());
        // Assemblies are recognised by their flag, never by category
        assert!("assembly".parse::<MappingKind>().is_err());
    }
}
