//! Database schema initialization

use rusqlite::params;

use super::{PartCache, SCHEMA_VERSION};
use crate::core::store::StoreError;

impl PartCache {
    pub(super) fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per data file, used for change detection
            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                hash TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS parts (
                id INTEGER PRIMARY KEY,
                ipn TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                units TEXT NOT NULL,
                assembly INTEGER NOT NULL,
                purchaseable INTEGER NOT NULL,
                active INTEGER NOT NULL,
                category INTEGER,
                default_supplier INTEGER,
                in_stock REAL,
                allocated REAL,
                on_order REAL,
                file_path TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_parts_file_path ON parts(file_path);

            -- BOM lines in file order
            CREATE TABLE IF NOT EXISTS bom_items (
                parent INTEGER NOT NULL,
                position INTEGER NOT NULL,
                sub_part INTEGER NOT NULL,
                quantity REAL NOT NULL,
                reference TEXT NOT NULL,
                note TEXT NOT NULL,
                optional INTEGER NOT NULL,
                inherited INTEGER NOT NULL,
                PRIMARY KEY (parent, position)
            );
            CREATE INDEX IF NOT EXISTS idx_bom_items_sub_part ON bom_items(sub_part);

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                parent INTEGER,
                file_path TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent);

            CREATE TABLE IF NOT EXISTS suppliers (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                website TEXT,
                file_path TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    pub(super) fn drop_tables(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS schema_version;
            DROP TABLE IF EXISTS files;
            DROP TABLE IF EXISTS parts;
            DROP TABLE IF EXISTS bom_items;
            DROP TABLE IF EXISTS categories;
            DROP TABLE IF EXISTS suppliers;
            DROP TABLE IF EXISTS cache_meta;
            "#,
        )?;
        Ok(())
    }
}
