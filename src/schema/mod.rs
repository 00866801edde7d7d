//! Schema system - record validation and report templates

pub mod registry;
pub mod template;
pub mod validator;

pub use registry::SchemaRegistry;
pub use template::{ReportRenderer, TemplateError, FLAT_BOM_MARKDOWN};
pub use validator::{FileCheckError, ValidationError, Validator};
