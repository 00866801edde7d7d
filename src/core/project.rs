//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityKind;

/// Marker directory at the project root
pub const PROJECT_DIR: &str = ".flatbom";

/// Suffix of every data file in a project
pub const DATA_SUFFIX: &str = ".fbom.yaml";

/// Represents a flat-BOM project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .flatbom/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use an explicit root (from `--project`), or discover from the working directory
    pub fn open(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::create_structure(root)
    }

    /// Force initialization even if .flatbom/ exists (config is rewritten)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(root)
    }

    fn create_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let dot_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&dot_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(dot_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(dot_dir.join(".gitignore"), "cache.db*\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for kind in EntityKind::all() {
            std::fs::create_dir_all(root.join(kind.directory()))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Flat BOM project configuration

# In-house supplier(s). Assemblies in the fabrication category sourced from
# one of these are expanded as "Internal Fab".
# primary_internal_supplier: 1
# additional_internal_suppliers: "7, 9"

# Category ids (each includes all of its sub-categories)
# fabrication_category: 5
# commercial_category: 8
# cut_to_length_category: 20

# Traversal
# max_depth: 4
expand_purchased_assemblies: false

# Internal-fab cut lists
enable_internal_fab_cuts: false
internal_fab_cut_units: "mm,in,cm,ft"

# Output format (auto, table, json, yaml, csv, tsv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .flatbom configuration directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Directory holding records of the given kind
    pub fn entity_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.directory())
    }

    /// Iterate all data files of a given kind
    pub fn iter_entity_files(&self, kind: EntityKind) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(kind))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(DATA_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ProjectError {
    #[error("not a flat-BOM project (searched from {searched_from:?})")]
    #[diagnostic(
        code(flatbom::project::not_found),
        help("Run 'flatbom init' to create one, or pass --project <dir>.")
    )]
    NotFound { searched_from: PathBuf },

    #[error("flat-BOM project already exists at {0:?}")]
    #[diagnostic(code(flatbom::project::exists))]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    #[diagnostic(code(flatbom::project::io))]
    IoError(String),
}
