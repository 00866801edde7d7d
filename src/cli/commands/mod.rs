//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod flat;
pub mod init;
pub mod tree;
pub mod validate;
pub mod where_used;
