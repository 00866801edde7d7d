//! Report rendering with embedded Tera templates

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Markdown flat-BOM report
pub const FLAT_BOM_MARKDOWN: &str = "flat_bom.md.tera";

#[derive(Debug, Error, miette::Diagnostic)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    #[diagnostic(code(flatbom::template::not_found))]
    NotFound(String),

    #[error("template rendering error: {0}")]
    #[diagnostic(code(flatbom::template::render))]
    RenderError(String),
}

/// Renders serializable reports through the embedded templates
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let name = file.as_ref();
            let Some(content) = EmbeddedTemplates::get(name) else {
                continue;
            };
            if let Ok(text) = std::str::from_utf8(&content.data) {
                tera.add_raw_template(name, text)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }

        Ok(Self { tera })
    }

    /// Render `template` with the fields of `report` as top-level variables
    pub fn render<T: Serialize>(&self, template: &str, report: &T) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == template) {
            return Err(TemplateError::NotFound(template.to_string()));
        }
        let context = tera::Context::from_serialize(report)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;
        self.tera
            .render(template, &context)
            .map_err(|e| TemplateError::RenderError(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markdown_template_renders_rows() {
        let renderer = ReportRenderer::new().unwrap();
        let report = json!({
            "metadata": {
                "part_id": 1,
                "ipn": "ASM-001",
                "part_name": "Frame",
                "build_qty": 2.0,
                "leaf_count": 3,
                "internal_fab_count": 0,
                "max_depth_reached": 2,
                "generated": "2026-01-01T00:00:00Z",
                "warnings": [
                    {"type": "inactive_part", "part_id": 4, "part_name": "Old", "message": "Part OLD is inactive"}
                ]
            },
            "rows": [{
                "ipn": "BLT-M6",
                "name": "Bolt",
                "category": "Coml",
                "total_qty": 8.0,
                "unit": "",
                "reference": "B1-B8",
                "total_required": 16.0,
                "in_stock": 10.0,
                "shortfall": 6.0,
                "cut_list": null,
                "internal_fab_cut_list": null
            }]
        });

        let out = renderer.render(FLAT_BOM_MARKDOWN, &report).unwrap();
        assert!(out.contains("# Flat BOM: ASM-001"));
        assert!(out.contains("| BLT-M6 | Bolt | Coml |"));
        assert!(out.contains("Part OLD is inactive"));
    }

    #[test]
    fn test_unknown_template() {
        let renderer = ReportRenderer::new().unwrap();
        let err = renderer.render("nope.tera", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }
}
