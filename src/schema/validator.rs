//! Schema validation with source-located diagnostics

use std::collections::HashMap;
use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::core::identity::EntityKind;
use crate::schema::registry::SchemaRegistry;
use crate::yaml::diagnostics::line_col_to_offset;

/// All violations found in one file
#[derive(Debug, Error, Diagnostic)]
#[error("{filename}: {summary}")]
#[diagnostic(code(flatbom::schema::invalid))]
pub struct ValidationError {
    filename: String,
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl ValidationError {
    fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let summary = match violations.len() {
            1 => "1 error".to_string(),
            n => format!("{n} errors"),
        };
        Self {
            filename: filename.to_string(),
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.message.as_str())
    }
}

/// Validator with every embedded schema compiled once
pub struct Validator {
    compiled: HashMap<EntityKind, JsonValidator>,
}

impl Validator {
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();

        for kind in registry.kinds() {
            let Some(text) = registry.get(kind) else {
                continue;
            };
            let schema = match serde_json::from_str::<JsonValue>(text) {
                Ok(schema) => schema,
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "embedded schema is not valid JSON");
                    continue;
                }
            };
            match validator_for(&schema) {
                Ok(validator) => {
                    compiled.insert(kind, validator);
                }
                Err(e) => tracing::warn!(%kind, error = %e, "embedded schema does not compile"),
            }
        }

        Self { compiled }
    }

    /// Check YAML text against the schema for `kind`, collecting every violation
    pub fn validate(
        &self,
        content: &str,
        filename: &str,
        kind: EntityKind,
    ) -> Result<(), ValidationError> {
        let yaml: serde_yml::Value = serde_yml::from_str(content).map_err(|e| {
            let violation = SchemaViolation {
                span: location_span(content, e.location()),
                message: format!("YAML parse error: {e}"),
                hint: "invalid YAML".to_string(),
                help: Some("Check indentation, colons and quoting".to_string()),
            };
            ValidationError::new(filename, content, vec![violation])
        })?;

        let json: JsonValue = serde_json::to_value(&yaml).map_err(|e| {
            let violation = SchemaViolation {
                span: (0, content.len()).into(),
                message: format!("cannot represent document as JSON: {e}"),
                hint: "conversion error".to_string(),
                help: None,
            };
            ValidationError::new(filename, content, vec![violation])
        })?;

        let Some(schema) = self.compiled.get(&kind) else {
            return Ok(());
        };

        let violations: Vec<SchemaViolation> = schema
            .iter_errors(&json)
            .map(|e| to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }

    /// Validate a data file, inferring its kind from the directory it lives in
    ///
    /// Returns `Ok(None)` for files outside the record directories.
    pub fn validate_file(&self, path: &Path) -> Result<Option<EntityKind>, FileCheckError> {
        let Some(kind) = EntityKind::from_path(path) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(path)?;
        self.validate(&content, &path.display().to_string(), kind)?;
        Ok(Some(kind))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&SchemaRegistry::default())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum FileCheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationError),

    #[error("IO error: {0}")]
    #[diagnostic(code(flatbom::schema::io))]
    Io(#[from] std::io::Error),
}

fn to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    let at = if path.is_empty() {
        "document root".to_string()
    } else {
        format!("'{path}'")
    };

    let (message, hint, help) = match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            (
                format!("Missing required field '{name}' at {at}"),
                "required field missing",
                Some(format!("Add '{name}' to the record")),
            )
        }
        ValidationErrorKind::Type { kind } => (
            format!("Wrong type at {at}: expected {kind:?}"),
            "wrong type",
            None,
        ),
        ValidationErrorKind::Minimum { limit } => (
            format!("Value at {at} is below the minimum of {limit}"),
            "too small",
            Some("Ids are positive integers".to_string()),
        ),
        ValidationErrorKind::MinLength { .. } => {
            (format!("Value at {at} must not be empty"), "empty", None)
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => (
            format!("Unknown field(s) at {at}: {}", unexpected.join(", ")),
            "unknown field",
            Some("Remove the field or check its spelling".to_string()),
        ),
        _ => (format!("Invalid value at {at}: {error}"), "invalid", None),
    };

    SchemaViolation {
        span: pointer_span(content, &path),
        message,
        hint: hint.to_string(),
        help,
    }
}

fn first_line_span(content: &str) -> SourceSpan {
    (0, content.find('\n').unwrap_or(content.len()).max(1)).into()
}

/// Span for a YAML parser location, to the end of that line
fn location_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    let Some(loc) = location else {
        return first_line_span(content);
    };
    let offset = line_col_to_offset(content, loc.line(), loc.column());
    let rest = &content[offset..];
    let len = rest.find('\n').unwrap_or(rest.len()).max(1);
    (offset, len).into()
}

/// Best-effort span for a JSON pointer such as `/bom/1/quantity`
fn pointer_span(content: &str, pointer: &str) -> SourceSpan {
    let segments: Vec<&str> = pointer.split('/').filter(|s| !s.is_empty()).collect();

    // Array indices have no key of their own; use the enclosing key
    let key = segments
        .iter()
        .rev()
        .find(|s| s.parse::<usize>().is_err());

    key.and_then(|k| key_span(content, k))
        .unwrap_or_else(|| first_line_span(content))
}

fn key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let needle = format!("{key}:");
    let mut offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start().trim_start_matches("- ");
        if trimmed.starts_with(&needle) {
            let start = offset + (line.len() - trimmed.len());
            return Some((start, trimmed.len()).into());
        }
        offset += line.len() + 1;
    }
    None
}
