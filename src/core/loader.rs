//! Entity loading utilities
//!
//! Generic helpers for reading every record of one kind out of a project.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::core::identity::EntityKind;
use crate::core::project::{Project, DATA_SUFFIX};
use crate::yaml::parse_yaml_file;

/// Load all records of type T from the project directory for `kind`
///
/// Files that fail to parse are skipped with a warning; run `flatbom validate`
/// to see the full diagnostics.
pub fn load_all<T: DeserializeOwned>(project: &Project, kind: EntityKind) -> Vec<(PathBuf, T)> {
    let mut entities = Vec::new();

    for path in project.iter_entity_files(kind) {
        match parse_yaml_file::<T>(&path) {
            Ok(entity) => entities.push((path, entity)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable {} file", kind);
            }
        }
    }

    entities
}

/// True if `path` looks like a project data file
pub fn is_data_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(DATA_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Supplier;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_all_empty_dir() {
        let dir = tempdir().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let result: Vec<(PathBuf, Supplier)> = load_all(&project, EntityKind::Supplier);
        assert!(result.is_empty());
    }

    #[test]
    fn test_load_all_skips_broken_files() {
        let dir = tempdir().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let suppliers = project.entity_dir(EntityKind::Supplier);
        fs::write(suppliers.join("a.fbom.yaml"), "id: 1\nname: Shop\n").unwrap();
        fs::write(suppliers.join("b.fbom.yaml"), "id: [\n").unwrap();

        let result: Vec<(PathBuf, Supplier)> = load_all(&project, EntityKind::Supplier);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1.name, "Shop");
    }

    #[test]
    fn test_parse_error_and_data_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.fbom.yaml");
        fs::write(&path, "name: no id\n").unwrap();
        assert!(parse_yaml_file::<Supplier>(&path).is_err());
        assert!(is_data_file(&path));
        assert!(!is_data_file(Path::new("x.yaml")));
    }
}
