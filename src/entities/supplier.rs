//! Supplier entity - companies parts are bought from (or made by)

use serde::{Deserialize, Serialize};

use crate::core::identity::SupplierId;

/// Supplier company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Supplier {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: SupplierId(id),
            name: name.into(),
            description: String::new(),
            website: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_yaml() {
        let supplier: Supplier = serde_yml::from_str("id: 4\nname: In-house shop\n").unwrap();
        assert_eq!(supplier, Supplier::new(4, "In-house shop"));
    }
}
