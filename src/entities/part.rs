//! Part entity - components and assemblies with their BOM lines

use serde::{Deserialize, Serialize};

use crate::core::identity::{CategoryId, PartId, SupplierId};

/// BOM line item - one parent/child edge with its quantity multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    /// Child part ID
    pub sub_part: PartId,

    /// Quantity of the child per one parent (may be fractional)
    #[serde(default = "default_quantity")]
    pub quantity: f64,

    /// Reference designators (e.g., "R1, R2")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,

    /// Free-text note; cut-to-length lines carry their length here
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,

    /// Line is optional for the build
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Line is inherited by variants
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inherited: bool,
}

fn default_quantity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl BomItem {
    /// Create a BOM line with no reference or note
    pub fn new(sub_part: PartId, quantity: f64) -> Self {
        Self {
            sub_part,
            quantity,
            reference: String::new(),
            note: String::new(),
            optional: false,
            inherited: false,
        }
    }

    /// Set the note text
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Set the reference designators
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

/// Live stock figures used for shortfall reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StockLevels {
    #[serde(default)]
    pub in_stock: f64,

    /// Stock allocated to builds and sales orders
    #[serde(default)]
    pub allocated: f64,

    /// Quantity on open purchase orders
    #[serde(default)]
    pub on_order: f64,
}

/// Part entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Primary key
    pub id: PartId,

    /// Internal part number
    #[serde(default)]
    pub ipn: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Unit of measure (e.g., "mm", "pcs"); empty means each
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub units: String,

    /// Part has its own BOM
    #[serde(default)]
    pub assembly: bool,

    #[serde(default)]
    pub purchaseable: bool,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_supplier: Option<SupplierId>,

    /// Direct BOM lines (assemblies only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bom: Vec<BomItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockLevels>,
}

impl Part {
    /// Create an active, non-assembly part
    pub fn new(id: u64, ipn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PartId(id),
            ipn: ipn.into(),
            name: name.into(),
            description: String::new(),
            units: String::new(),
            assembly: false,
            purchaseable: false,
            active: true,
            category: None,
            default_supplier: None,
            bom: Vec::new(),
            stock: None,
        }
    }

    /// Mark the part as an assembly
    pub fn as_assembly(mut self) -> Self {
        self.assembly = true;
        self
    }

    pub fn with_category(mut self, category: u64) -> Self {
        self.category = Some(CategoryId(category));
        self
    }

    pub fn with_supplier(mut self, supplier: u64) -> Self {
        self.default_supplier = Some(SupplierId(supplier));
        self.purchaseable = true;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Add a child to the BOM
    pub fn add_item(&mut self, item: BomItem) {
        self.bom.push(item);
    }

    /// Builder form of [`Part::add_item`]
    pub fn with_item(mut self, item: BomItem) -> Self {
        self.bom.push(item);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_defaults_from_minimal_yaml() {
        let yaml = "id: 12\nname: Hex bolt\n";
        let part: Part = serde_yml::from_str(yaml).unwrap();

        assert_eq!(part.id, PartId(12));
        assert!(part.active);
        assert!(!part.assembly);
        assert!(part.ipn.is_empty());
        assert!(part.bom.is_empty());
        assert!(part.stock.is_none());
    }

    #[test]
    fn test_bom_item_default_quantity() {
        let yaml = r#"
id: 1
name: Frame
assembly: true
bom:
  - sub_part: 2
  - sub_part: 3
    quantity: 2.5
    note: "Cut to 120mm"
"#;
        let part: Part = serde_yml::from_str(yaml).unwrap();

        assert_eq!(part.bom.len(), 2);
        assert_eq!(part.bom[0].quantity, 1.0);
        assert_eq!(part.bom[1].quantity, 2.5);
        assert_eq!(part.bom[1].note, "Cut to 120mm");
    }

    #[test]
    fn test_part_roundtrip_skips_empty_fields() {
        let part = Part::new(5, "TUBE-01", "Tube")
            .with_units("mm")
            .with_category(20);

        let yaml = serde_yml::to_string(&part).unwrap();
        assert!(!yaml.contains("bom:"));
        assert!(!yaml.contains("description"));

        let parsed: Part = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, part);
    }

    #[test]
    fn test_with_supplier_marks_purchaseable() {
        let part = Part::new(9, "MTR-01", "Motor").with_supplier(3);
        assert!(part.purchaseable);
        assert_eq!(part.default_supplier, Some(SupplierId(3)));
    }
}
