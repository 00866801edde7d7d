//! SQLite cache of project data
//!
//! The cache lives at `.flatbom/cache.db`, is gitignored and can always be
//! rebuilt from the YAML files. Opening it picks up every file whose mtime
//! and content hash changed since the last sync.

mod queries;
mod schema;
mod sync;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::core::project::Project;
use crate::core::store::StoreError;

/// Cache file location within a project
pub const CACHE_FILE: &str = ".flatbom/cache.db";

/// Bump when the table layout changes; a mismatch rebuilds the cache
const SCHEMA_VERSION: i32 = 2;

/// Counters reported by a rebuild or sync
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncStats {
    pub files_scanned: usize,
    pub files_added: usize,
    pub files_updated: usize,
    pub files_removed: usize,
    /// Files that could not be parsed and were left out
    pub files_skipped: usize,
    pub duration_ms: u64,
}

impl SyncStats {
    pub fn changed(&self) -> bool {
        self.files_added + self.files_updated + self.files_removed > 0
    }
}

/// Row counts and file size
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub parts: usize,
    pub bom_items: usize,
    pub categories: usize,
    pub suppliers: usize,
    pub files: usize,
    pub db_size_bytes: u64,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Part data cached in SQLite
pub struct PartCache {
    conn: Connection,
    project: Project,
}

impl PartCache {
    /// Open or create the cache and bring it up to date with the files on disk
    pub fn open(project: &Project) -> Result<Self, StoreError> {
        let (mut cache, fresh) = Self::connect(project)?;

        if fresh {
            cache.init_schema()?;
            cache.rebuild()?;
        } else if cache.needs_schema_rebuild()? {
            tracing::info!("cache schema changed; rebuilding");
            cache.reinitialize_schema()?;
        } else {
            let stats = cache.sync()?;
            if stats.changed() {
                tracing::debug!(
                    added = stats.files_added,
                    updated = stats.files_updated,
                    removed = stats.files_removed,
                    "cache synced"
                );
            }
        }

        Ok(cache)
    }

    /// Open the cache without touching its contents
    pub fn open_without_sync(project: &Project) -> Result<Self, StoreError> {
        let (mut cache, fresh) = Self::connect(project)?;
        if fresh || cache.needs_schema_rebuild()? {
            cache.reinitialize_schema_only()?;
        }
        Ok(cache)
    }

    fn connect(project: &Project) -> Result<(Self, bool), StoreError> {
        let cache_path = Self::path(project);
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let fresh = !cache_path.exists();
        let conn = Connection::open(&cache_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Ok((
            Self {
                conn,
                project: project.clone(),
            },
            fresh,
        ))
    }

    /// Location of the database for a project
    pub fn path(project: &Project) -> PathBuf {
        project.root().join(CACHE_FILE)
    }

    /// Delete the database and its WAL side files; returns false if there was none
    pub fn remove(project: &Project) -> Result<bool, StoreError> {
        let cache_path = Self::path(project);
        if !cache_path.exists() {
            return Ok(false);
        }
        fs::remove_file(&cache_path)?;
        for suffix in ["-wal", "-shm", "-journal"] {
            let side = PathBuf::from(format!("{}{}", cache_path.display(), suffix));
            if side.exists() {
                fs::remove_file(side)?;
            }
        }
        Ok(true)
    }

    fn needs_schema_rebuild(&self) -> Result<bool, StoreError> {
        let current_version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        Ok(current_version != SCHEMA_VERSION)
    }

    fn reinitialize_schema(&mut self) -> Result<(), StoreError> {
        self.reinitialize_schema_only()?;
        self.rebuild()?;
        Ok(())
    }

    fn reinitialize_schema_only(&mut self) -> Result<(), StoreError> {
        self.drop_tables()?;
        self.init_schema()
    }

    /// Row counts per table
    pub fn statistics(&self) -> Result<CacheStats, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let last_sync = self
            .meta("last_sync")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CacheStats {
            parts: count("parts")?,
            bom_items: count("bom_items")?,
            categories: count("categories")?,
            suppliers: count("suppliers")?,
            files: count("files")?,
            db_size_bytes: fs::metadata(Self::path(&self.project))
                .map(|m| m.len())
                .unwrap_or(0),
            last_sync,
        })
    }

    /// Time of the last rebuild or sync as Unix nanoseconds
    fn last_sync_nanos(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .meta("last_sync")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .and_then(|dt| dt.timestamp_nanos_opt()))
    }

    fn meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Empty every data table, keeping the schema
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            DELETE FROM bom_items;
            DELETE FROM parts;
            DELETE FROM categories;
            DELETE FROM suppliers;
            DELETE FROM files;
            DELETE FROM cache_meta;
            "#,
        )?;
        Ok(())
    }
}

/// File modification time as Unix nanoseconds
fn get_file_mtime(path: &Path) -> Result<i64, StoreError> {
    let mtime = fs::metadata(path)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    Ok(mtime)
}

/// SHA-256 of file content, hex encoded
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
