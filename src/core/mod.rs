//! Core module - project layout, configuration and data access

pub mod cache;
pub mod config;
pub mod identity;
pub mod loader;
pub mod project;
pub mod store;

pub use cache::{CacheStats, PartCache, SyncStats};
pub use config::Config;
pub use identity::{CategoryId, EntityKind, IdParseError, PartId, SupplierId};
pub use project::{Project, ProjectError};
pub use store::{BomLine, BomSource, PartStore, StoreError};
