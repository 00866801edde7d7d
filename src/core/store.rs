//! Read access to parts, BOM lines, categories and suppliers
//!
//! [`BomSource`] is the only way the flattener touches stored data. Two
//! implementations exist: [`PartStore`], an in-memory map loaded from YAML (or
//! built directly in tests), and [`PartCache`](crate::core::cache::PartCache),
//! the SQLite cache.

use std::collections::BTreeMap;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::{CategoryId, EntityKind, PartId, SupplierId};
use crate::core::loader::load_all;
use crate::core::project::Project;
use crate::entities::category::descendants_of;
use crate::entities::{BomItem, Category, Part, Supplier};

/// Errors raised by a data source
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("duplicate {kind} id {id} in {path}")]
    #[diagnostic(
        code(flatbom::store::duplicate_id),
        help("Every record of one kind needs a unique id.")
    )]
    DuplicateId {
        kind: EntityKind,
        id: u64,
        path: PathBuf,
    },

    #[error("cache error: {0}")]
    #[diagnostic(
        code(flatbom::store::cache),
        help("Try 'flatbom cache rebuild'.")
    )]
    Cache(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(flatbom::store::io))]
    Io(#[from] std::io::Error),
}

/// One direct child of an assembly, resolved to its part record
#[derive(Debug, Clone, PartialEq)]
pub struct BomLine {
    pub sub_part: Part,
    pub quantity: f64,
    pub reference: String,
    pub note: String,
    pub optional: bool,
    pub inherited: bool,
}

impl BomLine {
    pub fn new(sub_part: Part, item: &BomItem) -> Self {
        Self {
            sub_part,
            quantity: item.quantity,
            reference: item.reference.clone(),
            note: item.note.clone(),
            optional: item.optional,
            inherited: item.inherited,
        }
    }
}

/// Read-only data source the flattener runs against
pub trait BomSource {
    /// Fetch one part by id
    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError>;

    /// Direct BOM lines of `parent`; lines whose child does not resolve are skipped
    fn bom_lines(&self, parent: PartId) -> Result<Vec<BomLine>, StoreError>;

    /// `id` plus all sub-categories, or `None` if the category does not exist
    fn category_descendants(&self, id: CategoryId) -> Result<Option<Vec<CategoryId>>, StoreError>;

    fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError>;

    /// Assemblies that list `id` directly in their BOM, with the referencing line
    fn parents_of(&self, id: PartId) -> Result<Vec<(Part, BomItem)>, StoreError>;
}

/// In-memory data source
#[derive(Debug, Default, Clone)]
pub struct PartStore {
    parts: BTreeMap<PartId, Part>,
    categories: BTreeMap<CategoryId, Category>,
    suppliers: BTreeMap<SupplierId, Supplier>,
}

impl PartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every part, category and supplier file of a project
    pub fn load(project: &Project) -> Result<Self, StoreError> {
        let mut store = Self::new();

        for (path, category) in load_all::<Category>(project, EntityKind::Category) {
            let id = category.id;
            if store.categories.insert(id, category).is_some() {
                return Err(StoreError::DuplicateId {
                    kind: EntityKind::Category,
                    id: id.get(),
                    path,
                });
            }
        }

        for (path, supplier) in load_all::<Supplier>(project, EntityKind::Supplier) {
            let id = supplier.id;
            if store.suppliers.insert(id, supplier).is_some() {
                return Err(StoreError::DuplicateId {
                    kind: EntityKind::Supplier,
                    id: id.get(),
                    path,
                });
            }
        }

        for (path, part) in load_all::<Part>(project, EntityKind::Part) {
            let id = part.id;
            if store.parts.insert(id, part).is_some() {
                return Err(StoreError::DuplicateId {
                    kind: EntityKind::Part,
                    id: id.get(),
                    path,
                });
            }
        }

        tracing::debug!(
            parts = store.parts.len(),
            categories = store.categories.len(),
            suppliers = store.suppliers.len(),
            "loaded project data"
        );

        Ok(store)
    }

    pub fn insert_part(&mut self, part: Part) {
        self.parts.insert(part.id, part);
    }

    pub fn insert_category(&mut self, category: Category) {
        self.categories.insert(category.id, category);
    }

    pub fn insert_supplier(&mut self, supplier: Supplier) {
        self.suppliers.insert(supplier.id, supplier);
    }

    /// Builder form of [`PartStore::insert_part`]
    pub fn with_part(mut self, part: Part) -> Self {
        self.insert_part(part);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.insert_category(category);
        self
    }

    pub fn with_supplier(mut self, supplier: Supplier) -> Self {
        self.insert_supplier(supplier);
        self
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn suppliers(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }
}

impl BomSource for PartStore {
    fn part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        Ok(self.parts.get(&id).cloned())
    }

    fn bom_lines(&self, parent: PartId) -> Result<Vec<BomLine>, StoreError> {
        let Some(part) = self.parts.get(&parent) else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::with_capacity(part.bom.len());
        for item in &part.bom {
            match self.parts.get(&item.sub_part) {
                Some(child) => lines.push(BomLine::new(child.clone(), item)),
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
        Ok(descendants_of(&self.categories, id))
    }

    fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError> {
        Ok(self.suppliers.contains_key(&id))
    }

    fn parents_of(&self, id: PartId) -> Result<Vec<(Part, BomItem)>, StoreError> {
        let mut parents = Vec::new();
        for part in self.parts.values() {
            for item in part.bom.iter().filter(|item| item.sub_part == id) {
                parents.push((part.clone(), item.clone()));
            }
        }
        Ok(parents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> PartStore {
        PartStore::new()
            .with_part(
                Part::new(1, "ASM-1", "Frame")
                    .as_assembly()
                    .with_item(BomItem::new(PartId(2), 4.0).with_reference("B1-B4"))
                    .with_item(BomItem::new(PartId(99), 1.0)),
            )
            .with_part(Part::new(2, "BLT-1", "Bolt"))
            .with_category(Category::new(5, "Fab", None))
            .with_category(Category::new(6, "Sheet", Some(5)))
            .with_supplier(Supplier::new(1, "Shop"))
    }

    #[test]
    fn test_bom_lines_skip_missing_children() {
        let store = sample();
        let lines = store.bom_lines(PartId(1)).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sub_part.ipn, "BLT-1");
        assert_eq!(lines[0].quantity, 4.0);
        assert_eq!(lines[0].reference, "B1-B4");
    }

    #[test]
    fn test_lookups() {
        let store = sample();
        assert!(store.part(PartId(2)).unwrap().is_some());
        assert!(store.part(PartId(3)).unwrap().is_none());
        assert!(store.supplier_exists(SupplierId(1)).unwrap());
        assert!(!store.supplier_exists(SupplierId(2)).unwrap());
        assert_eq!(
            store.category_descendants(CategoryId(5)).unwrap(),
            Some(vec![CategoryId(5), CategoryId(6)])
        );
    }

    #[test]
    fn test_parents_of() {
        let store = sample();
        let parents = store.parents_of(PartId(2)).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].0.id, PartId(1));
        assert_eq!(parents[0].1.quantity, 4.0);
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let dir = tempdir().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let parts = project.entity_dir(EntityKind::Part);
        fs::write(parts.join("a.fbom.yaml"), "id: 1\nname: A\n").unwrap();
        fs::write(parts.join("b.fbom.yaml"), "id: 1\nname: B\n").unwrap();

        let err = PartStore::load(&project).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { id: 1, .. }));
    }

    #[test]
    fn test_load_reads_all_kinds() {
        let dir = tempdir().unwrap();
        let project = Project::init(dir.path()).unwrap();
        fs::write(
            project.entity_dir(EntityKind::Part).join("frame.fbom.yaml"),
            "id: 1\nname: Frame\nassembly: true\nbom:\n  - sub_part: 2\n    quantity: 3\n",
        )
        .unwrap();
        fs::write(
            project.entity_dir(EntityKind::Part).join("bolt.fbom.yaml"),
            "id: 2\nname: Bolt\n",
        )
        .unwrap();
        fs::write(
            project.entity_dir(EntityKind::Category).join("fab.fbom.yaml"),
            "id: 5\nname: Fab\n",
        )
        .unwrap();

        let store = PartStore::load(&project).unwrap();
        assert_eq!(store.parts().count(), 2);
        assert_eq!(store.categories().count(), 1);
        assert_eq!(store.bom_lines(PartId(1)).unwrap()[0].quantity, 3.0);
    }
}
