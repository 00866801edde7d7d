//! Entity type definitions
//!
//! A flat-BOM project holds three record types, read-only to the flattener:
//!
//! - [`Part`] - Components and assemblies; assemblies carry their [`BomItem`] lines
//! - [`Category`] - Hierarchical part categories used for classification
//! - [`Supplier`] - Companies parts are sourced from, some of them in-house

pub mod category;
pub mod part;
pub mod supplier;

pub use category::Category;
pub use part::{BomItem, Part, StockLevels};
pub use supplier::Supplier;
