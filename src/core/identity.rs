//! Numeric identifiers for parts, categories and suppliers
//!
//! The host inventory system keys every record by a positive integer. Each
//! record type gets its own newtype so a supplier id can never be passed where
//! a category id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Record kinds stored in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Part (component or assembly) with its BOM lines
    Part,
    /// Part category (hierarchical)
    Category,
    /// Supplier / manufacturer company
    Supplier,
}

impl EntityKind {
    /// Lower-case name used in file names and schema lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Part => "part",
            EntityKind::Category => "category",
            EntityKind::Supplier => "supplier",
        }
    }

    /// Get all record kinds
    pub fn all() -> &'static [EntityKind] {
        &[EntityKind::Part, EntityKind::Category, EntityKind::Supplier]
    }

    /// Project subdirectory holding records of this kind
    pub fn directory(&self) -> &'static str {
        match self {
            EntityKind::Part => "parts",
            EntityKind::Category => "categories",
            EntityKind::Supplier => "suppliers",
        }
    }

    /// Determine record kind from a file path by examining its parent directories
    pub fn from_path(path: &Path) -> Option<Self> {
        path.ancestors().skip(1).find_map(|dir| {
            let name = dir.file_name()?.to_str()?;
            Self::all().iter().copied().find(|k| k.directory() == name)
        })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors when parsing an identifier from user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("empty {0} id")]
    Empty(&'static str),

    #[error("invalid {kind} id '{input}': expected a positive integer")]
    NotANumber { kind: &'static str, input: String },

    #[error("{0} id must be greater than zero")]
    Zero(&'static str),
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw integer value
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(IdParseError::Empty($label));
                }
                let value: u64 = trimmed.parse().map_err(|_| IdParseError::NotANumber {
                    kind: $label,
                    input: trimmed.to_string(),
                })?;
                if value == 0 {
                    return Err(IdParseError::Zero($label));
                }
                Ok(Self(value))
            }
        }
    };
}

numeric_id!(
    /// Primary key of a part
    PartId,
    "part"
);
numeric_id!(
    /// Primary key of a part category
    CategoryId,
    "category"
);
numeric_id!(
    /// Primary key of a supplier company
    SupplierId,
    "supplier"
);
