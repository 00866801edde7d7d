//! Configuration management with layered hierarchy

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::core::identity::{CategoryId, SupplierId};
use crate::core::project::Project;

/// Default units for which internal-fab cut lists are built
pub const DEFAULT_INTERNAL_FAB_UNITS: &str = "mm,in,cm,ft";

/// Flat-BOM configuration with layered hierarchy
///
/// Every field is optional so that a later layer only overrides what it sets.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Main in-house supplier
    pub primary_internal_supplier: Option<SupplierId>,

    /// Extra in-house suppliers, comma separated
    #[serde(deserialize_with = "loose_list")]
    pub additional_internal_suppliers: Option<String>,

    pub fabrication_category: Option<CategoryId>,
    pub commercial_category: Option<CategoryId>,
    pub cut_to_length_category: Option<CategoryId>,

    /// Treat purchased assemblies as internal nodes and list their children
    pub expand_purchased_assemblies: Option<bool>,

    /// Stop expanding BOMs at this level
    pub max_depth: Option<usize>,

    /// Build cut lists for raw stock consumed by internal-fab assemblies
    pub enable_internal_fab_cuts: Option<bool>,

    /// Units eligible for internal-fab cut lists, comma separated
    #[serde(deserialize_with = "loose_list")]
    pub internal_fab_cut_units: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Tracing filter directive (e.g. "info", "flatbom=debug")
    pub log_level: Option<String>,

    /// "text" or "json"
    pub log_format: Option<String>,
}

/// Accept `"7, 9"`, `7` or `[7, 9]` for list-valued settings
fn loose_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yml::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| scalar_text(&v)))
}

fn scalar_text(value: &serde_yml::Value) -> Option<String> {
    match value {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

impl Config {
    /// Load configuration from all sources, discovering the project from the working directory
    pub fn load() -> Self {
        Self::load_for(Project::discover().ok().as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        // 1. Built-in defaults (already in Default impl)
        let mut config = Config::default();

        // 2. Global user config (~/.config/flatbom/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.flatbom/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&Self::project_config_path(project)) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Parse one config file; unreadable or malformed files are skipped
    pub fn read_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(depth) = lookup("FLATBOM_MAX_DEPTH") {
            match depth.trim().parse::<usize>() {
                Ok(d) => self.max_depth = Some(d),
                Err(_) => tracing::warn!(value = %depth, "FLATBOM_MAX_DEPTH is not an integer"),
            }
        }
        if let Some(level) = lookup("FLATBOM_LOG") {
            self.log_level = Some(level);
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "flatbom")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Get the path to a project's config file
    pub fn project_config_path(project: &Project) -> PathBuf {
        project.config_dir().join("config.yaml")
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            };
        }
        take!(
            primary_internal_supplier,
            additional_internal_suppliers,
            fabrication_category,
            commercial_category,
            cut_to_length_category,
            expand_purchased_assemblies,
            max_depth,
            enable_internal_fab_cuts,
            internal_fab_cut_units,
            default_format,
            log_level,
            log_format
        );
    }

    pub fn expand_purchased_assemblies(&self) -> bool {
        self.expand_purchased_assemblies.unwrap_or(false)
    }

    pub fn enable_internal_fab_cuts(&self) -> bool {
        self.enable_internal_fab_cuts.unwrap_or(false)
    }

    /// Comma-separated units string, falling back to the default set
    pub fn internal_fab_cut_units(&self) -> &str {
        self.internal_fab_cut_units
            .as_deref()
            .unwrap_or(DEFAULT_INTERNAL_FAB_UNITS)
    }

    /// Configured category id for a mapping key
    pub fn category_setting(&self, key: &str) -> Option<CategoryId> {
        match key {
            "fabrication" => self.fabrication_category,
            "commercial" => self.commercial_category,
            "cut_to_length" => self.cut_to_length_category,
            _ => None,
        }
    }
}
