//! Output finalization stage.

use crate::build::headings::splice_nav_heading;
use crate::build::minify::{MinifyType, minify};
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::build::scan::rewrite_deferred;

/// Stage that turns rendered pages into exactly what gets written:
/// contents list spliced into `<nav-heading>`, `!{…}` rewritten to `${…}`,
/// post-render hooks applied, then minified.
pub struct FinalizeStage;

impl Stage for FinalizeStage {
    fn name(&self) -> &'static str {
        "finalize"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs {
            let output = doc.output.take().ok_or_else(|| {
                PipelineError::stage(
                    "finalize",
                    format!("{} has no output (was the template stage run?)", doc.slug()),
                )
            })?;

            let output = if doc.record.is_html {
                splice_nav_heading(&output, &doc.nav_heading)
            } else {
                output
            };
            let output = rewrite_deferred(&output);
            let output = ctx.hooks.post_render(&doc.record, output);

            let output = if doc.record.is_html {
                minify(output, MinifyType::Html, &ctx.config.minify)
            } else if doc.record.is_xml {
                minify(output, MinifyType::Xml, &ctx.config.minify)
            } else {
                output
            };

            doc.output = Some(output);
        }
        Ok(())
    }
}
