//! Page template rendering stage.

use serde_json::Value as Json;

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::log;

/// Stage that expands each record's template around its content.
///
/// The template sees the record as `data`, with `data.content` replaced by
/// the expanded body and `data.navHeading` set to the contents list.
/// Records without a template (or whose template is missing) output their
/// content as is.
pub struct TemplateStage;

impl Stage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs {
            let Some(name) = doc.record.template.as_deref() else {
                doc.output = Some(doc.content.clone());
                continue;
            };
            let Some(template) = ctx.renderer.template(name) else {
                log!("warn"; "template '{}' for {} not found", name, doc.record.filename);
                doc.output = Some(doc.content.clone());
                continue;
            };

            let mut data = doc.data.clone();
            if let Json::Object(map) = &mut data {
                map.insert("content".to_string(), Json::String(doc.content.clone()));
                map.insert("navHeading".to_string(), Json::String(doc.nav_heading.clone()));
            }

            doc.output = Some(ctx.renderer.expand(name, template, &data, ctx.tacs)?);
        }

        Ok(())
    }
}
