//! flatbom: flat bill-of-materials generator
//!
//! Collapses a multi-level BOM stored as plain YAML records into one
//! deduplicated list of the parts to buy, cut or fabricate, with total
//! quantities, cut lists and advisory warnings.

pub mod bom;
pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod yaml;
