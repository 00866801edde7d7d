//! Cache synchronization with the filesystem
//!
//! A file is re-read when its mtime changed and its SHA-256 no longer matches
//! the stored hash. Files modified shortly before the last sync are always
//! re-hashed, since a coarse filesystem clock can hide a second write. Rows are keyed by the file they came from, so a changed
//! file is forgotten and re-inserted as a whole.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;

use super::{compute_hash, get_file_mtime, PartCache, SyncStats};
use crate::core::identity::EntityKind;
use crate::core::store::StoreError;
use crate::entities::{Category, Part, Supplier};
use crate::yaml::parse_yaml;

/// Mtimes this close to the last sync are not trusted
const MTIME_GRANULARITY_NANOS: i64 = 2_000_000_000;

impl PartCache {
    /// Drop all cached rows and re-read every data file
    pub fn rebuild(&mut self) -> Result<SyncStats, StoreError> {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        self.clear()?;

        let files = self.scan_files();
        let tx = self.conn.unchecked_transaction()?;
        for (rel_path, (kind, path)) in &files {
            stats.files_scanned += 1;
            if self.cache_file(*kind, path, rel_path)? {
                stats.files_added += 1;
            } else {
                stats.files_skipped += 1;
            }
        }
        tx.commit()?;

        self.set_meta("last_sync", &Utc::now().to_rfc3339())?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(files = stats.files_added, "cache rebuilt");
        Ok(stats)
    }

    /// Re-read only the files that changed since the last sync
    pub fn sync(&mut self) -> Result<SyncStats, StoreError> {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        let current = self.scan_files();
        stats.files_scanned = current.len();
        let last_sync = self.last_sync_nanos()?;

        let mut cached: HashMap<String, (i64, String)> = HashMap::new();
        {
            let mut stmt = self.conn.prepare("SELECT path, mtime, hash FROM files")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (path, mtime, hash) = row?;
                cached.insert(path, (mtime, hash));
            }
        }

        let mut changed: Vec<(&String, EntityKind, &PathBuf)> = Vec::new();
        let mut touched: Vec<(&String, i64)> = Vec::new();

        for (rel_path, (kind, path)) in &current {
            match cached.get(rel_path) {
                None => {
                    stats.files_added += 1;
                    changed.push((rel_path, *kind, path));
                }
                Some((cached_mtime, cached_hash)) => {
                    let mtime = get_file_mtime(path)?;
                    let settled = last_sync.is_some_and(|synced| {
                        mtime.saturating_add(MTIME_GRANULARITY_NANOS) < synced
                    });
                    if mtime == *cached_mtime && settled {
                        continue;
                    }
                    let content = fs::read_to_string(path)?;
                    if compute_hash(&content) != *cached_hash {
                        stats.files_updated += 1;
                        changed.push((rel_path, *kind, path));
                    } else {
                        touched.push((rel_path, mtime));
                    }
                }
            }
        }

        let removed: Vec<&String> = cached
            .keys()
            .filter(|path| !current.contains_key(*path))
            .collect();

        let tx = self.conn.unchecked_transaction()?;

        // Forget everything first so an id moving between files is not a duplicate
        for rel_path in &removed {
            self.forget_file(rel_path)?;
            stats.files_removed += 1;
        }
        for (rel_path, _, _) in &changed {
            self.forget_file(rel_path)?;
        }

        for (rel_path, kind, path) in &changed {
            if !self.cache_file(*kind, path, rel_path)? {
                stats.files_skipped += 1;
            }
        }
        for (rel_path, mtime) in &touched {
            self.conn.execute(
                "UPDATE files SET mtime = ?1 WHERE path = ?2",
                params![mtime, rel_path],
            )?;
        }

        tx.commit()?;

        self.set_meta("last_sync", &Utc::now().to_rfc3339())?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Every data file in the project keyed by project-relative path
    fn scan_files(&self) -> BTreeMap<String, (EntityKind, PathBuf)> {
        let mut files = BTreeMap::new();
        for kind in EntityKind::all() {
            for path in self.project.iter_entity_files(*kind) {
                let rel_path = self.relative(&path);
                files.insert(rel_path, (*kind, path));
            }
        }
        files
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(self.project.root())
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Insert the records of one file; returns false if the file did not parse
    fn cache_file(&self, kind: EntityKind, path: &Path, rel_path: &str) -> Result<bool, StoreError> {
        let content = fs::read_to_string(path)?;
        let mtime = get_file_mtime(path)?;
        let hash = compute_hash(&content);

        let inserted = match kind {
            EntityKind::Part => match parse_or_warn::<Part>(&content, path, kind) {
                Some(part) => {
                    self.insert_part(&part, rel_path)?;
                    true
                }
                None => false,
            },
            EntityKind::Category => match parse_or_warn::<Category>(&content, path, kind) {
                Some(category) => {
                    self.insert_category(&category, rel_path)?;
                    true
                }
                None => false,
            },
            EntityKind::Supplier => match parse_or_warn::<Supplier>(&content, path, kind) {
                Some(supplier) => {
                    self.insert_supplier(&supplier, rel_path)?;
                    true
                }
                None => false,
            },
        };

        // Recorded even when unparsable so it is not re-read until it changes
        self.conn.execute(
            "INSERT OR REPLACE INTO files (path, kind, mtime, hash) VALUES (?1, ?2, ?3, ?4)",
            params![rel_path, kind.as_str(), mtime, hash],
        )?;

        Ok(inserted)
    }

    /// Remove every row that came from `rel_path`
    fn forget_file(&self, rel_path: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM bom_items WHERE parent IN (SELECT id FROM parts WHERE file_path = ?1)",
            params![rel_path],
        )?;
        for table in ["parts", "categories", "suppliers"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE file_path = ?1"),
                params![rel_path],
            )?;
        }
        self.conn
            .execute("DELETE FROM files WHERE path = ?1", params![rel_path])?;
        Ok(())
    }

    /// Fail if `id` is already cached from another file
    fn check_duplicate(
        &self,
        kind: EntityKind,
        table: &str,
        id: u64,
        rel_path: &str,
    ) -> Result<(), StoreError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT file_path FROM {table} WHERE id = ?1"),
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(other) if other != rel_path => Err(StoreError::DuplicateId {
                kind,
                id,
                path: self.project.root().join(rel_path),
            }),
            _ => Ok(()),
        }
    }

    fn insert_part(&self, part: &Part, rel_path: &str) -> Result<(), StoreError> {
        self.check_duplicate(EntityKind::Part, "parts", part.id.get(), rel_path)?;

        let stock = part.stock;
        self.conn.execute(
            "INSERT INTO parts (id, ipn, name, description, units, assembly, purchaseable, \
             active, category, default_supplier, in_stock, allocated, on_order, file_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                part.id.get() as i64,
                part.ipn,
                part.name,
                part.description,
                part.units,
                part.assembly,
                part.purchaseable,
                part.active,
                part.category.map(|c| c.get() as i64),
                part.default_supplier.map(|s| s.get() as i64),
                stock.map(|s| s.in_stock),
                stock.map(|s| s.allocated),
                stock.map(|s| s.on_order),
                rel_path,
            ],
        )?;

        for (position, item) in part.bom.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO bom_items (parent, position, sub_part, quantity, reference, note, \
                 optional, inherited) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    part.id.get() as i64,
                    position as i64,
                    item.sub_part.get() as i64,
                    item.quantity,
                    item.reference,
                    item.note,
                    item.optional,
                    item.inherited,
                ],
            )?;
        }

        Ok(())
    }

    fn insert_category(&self, category: &Category, rel_path: &str) -> Result<(), StoreError> {
        self.check_duplicate(EntityKind::Category, "categories", category.id.get(), rel_path)?;
        self.conn.execute(
            "INSERT INTO categories (id, name, parent, file_path) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id.get() as i64,
                category.name,
                category.parent.map(|p| p.get() as i64),
                rel_path,
            ],
        )?;
        Ok(())
    }

    fn insert_supplier(&self, supplier: &Supplier, rel_path: &str) -> Result<(), StoreError> {
        self.check_duplicate(EntityKind::Supplier, "suppliers", supplier.id.get(), rel_path)?;
        self.conn.execute(
            "INSERT INTO suppliers (id, name, description, website, file_path) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                supplier.id.get() as i64,
                supplier.name,
                supplier.description,
                supplier.website,
                rel_path,
            ],
        )?;
        Ok(())
    }
}

fn parse_or_warn<T: DeserializeOwned>(content: &str, path: &Path, kind: EntityKind) -> Option<T> {
    match parse_yaml::<T>(content, &path.display().to_string()) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable {} file", kind);
            None
        }
    }
}
