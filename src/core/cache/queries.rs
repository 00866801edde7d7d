//! Read queries backing [`BomSource`]
//!
//! Every trait method is a single statement. Parts read from the cache have an
//! empty `bom` list; their lines come from [`BomSource::bom_lines`].

use rusqlite::{params, OptionalExtension, Row};

use super::PartCache;
use crate::core::identity::{CategoryId, PartId, SupplierId};
use crate::core::store::{BomLine, BomSource, StoreError};
use crate::entities::{BomItem, Part, StockLevels};

const PART_COLUMNS: &str = "p.id, p.ipn, p.name, p.description, p.units, p.assembly, \
     p.purchaseable, p.active, p.category, p.default_supplier, p.in_stock, p.allocated, p.on_order";

const ITEM_COLUMNS: &str = "b.sub_part, b.quantity, b.reference, b.note, b.optional, b.inherited";

/// Number of columns in [`ITEM_COLUMNS`]
const ITEM_WIDTH: usize = 6;

fn part_from_row(row: &Row, offset: usize) -> rusqlite::Result<Part> {
    let col = |i: usize| offset + i;

    let in_stock: Option<f64> = row.get(col(10))?;
    let allocated: Option<f64> = row.get(col(11))?;
    let on_order: Option<f64> = row.get(col(12))?;
    let stock = if in_stock.is_some() || allocated.is_some() || on_order.is_some() {
        Some(StockLevels {
            in_stock: in_stock.unwrap_or_default(),
            allocated: allocated.unwrap_or_default(),
            on_order: on_order.unwrap_or_default(),
        })
    } else {
        None
    };

    Ok(Part {
        id: PartId(row.get::<_, i64>(col(0))? as u64),
        ipn: row.get(col(1))?,
        name: row.get(col(2))?,
        description: row.get(col(3))?,
        units: row.get(col(4))?,
        assembly: row.get(col(5))?,
        purchaseable: row.get(col(6))?,
        active: row.get(col(7))?,
        category: row
            .get::<_, Option<i64>>(col(8))?
            .map(|id| CategoryId(id as u64)),
        default_supplier: row
            .get::<_, Option<i64>>(col(9))?
            .map(|id| SupplierId(id as u64)),
        bom: Vec::new(),
        stock,
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<BomItem> {
    Ok(BomItem {
        sub_part: PartId(row.get::<_, i64>(0)? as u64),
        quantity: row.get(1)?,
        reference: row.get(2)?,
        note: row.get(3)?,
        optional: row.get(4)?,
        inherited: row.get(5)?,
    })
}

impl BomSource for PartCache {
    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        let sql = format!("SELECT {PART_COLUMNS} FROM parts p WHERE p.id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.get() as i64], |row| part_from_row(row, 0))
            .optional()?)
    }

    fn bom_lines(&self, parent: PartId) -> Result<Vec<BomLine>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, {PART_COLUMNS} FROM bom_items b \
             LEFT JOIN parts p ON p.id = b.sub_part \
             WHERE b.parent = ?1 ORDER BY b.position"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![parent.get() as i64], |row| {
            let item = item_from_row(row)?;
            let resolved: Option<i64> = row.get(ITEM_WIDTH)?;
            let child = match resolved {
                Some(_) => Some(part_from_row(row, ITEM_WIDTH)?),
                None => None,
            };
            Ok((item, child))
        })?;

        let mut lines = Vec::new();
        for row in rows {
            let (item, child) = row?;
            match child {
                Some(child) => lines.push(BomLine::new(child, &item)),
                None => tracing::warn!(
                    parent = %parent,
                    sub_part = %item.sub_part,
                    "BOM line references a missing part; skipped"
                ),
            }
        }
        Ok(lines)
    }

    fn category_descendants(&self, id: CategoryId) -> Result<Option<Vec<CategoryId>>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            WITH RECURSIVE tree(id) AS (
                SELECT id FROM categories WHERE id = ?1
                UNION
                SELECT c.id FROM categories c JOIN tree t ON c.parent = t.id
            )
            SELECT id FROM tree ORDER BY id
            "#,
        )?;
        let ids = stmt
            .query_map(params![id.get() as i64], |row| {
                Ok(CategoryId(row.get::<_, i64>(0)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if ids.is_empty() { None } else { Some(ids) })
    }

    fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = ?1)",
            params![id.get() as i64],
            |row| row.get(0),
        )?)
    }

    fn parents_of(&self, id: PartId) -> Result<Vec<(Part, BomItem)>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, {PART_COLUMNS} FROM bom_items b \
             JOIN parts p ON p.id = b.parent \
             WHERE b.sub_part = ?1 ORDER BY p.id, b.position"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let parents = stmt
            .query_map(params![id.get() as i64], |row| {
                Ok((part_from_row(row, ITEM_WIDTH)?, item_from_row(row)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parents)
    }
}
