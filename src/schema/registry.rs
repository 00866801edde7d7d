//! JSON schemas embedded in the binary

use std::collections::HashMap;

use rust_embed::Embed;

use crate::core::identity::EntityKind;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Schema source text by record kind
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<EntityKind, String>,
}

impl SchemaRegistry {
    /// Schema file name for a record kind
    pub fn file_name(kind: EntityKind) -> String {
        format!("{}.schema.json", kind.as_str())
    }

    pub fn get(&self, kind: EntityKind) -> Option<&str> {
        self.schemas.get(&kind).map(String::as_str)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        EntityKind::all()
            .iter()
            .copied()
            .filter(|k| self.schemas.contains_key(k))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut schemas = HashMap::new();
        for kind in EntityKind::all() {
            let Some(file) = EmbeddedSchemas::get(&Self::file_name(*kind)) else {
                continue;
            };
            if let Ok(text) = std::str::from_utf8(&file.data) {
                schemas.insert(*kind, text.to_string());
            }
        }
        Self { schemas }
    }
}
