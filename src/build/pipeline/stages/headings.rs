//! Heading anchor stage.

use crate::build::headings::add_heading_anchors;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that gives HTML records heading ids and a contents list.
///
/// The anchored body replaces the record's entry in the rendered-content
/// table so `contentRendered` carries the same ids as the page.
pub struct HeadingsStage;

impl Stage for HeadingsStage {
    fn name(&self) -> &'static str {
        "headings"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs.iter_mut().filter(|doc| doc.record.is_html) {
            let out = add_heading_anchors(&doc.content, &ctx.config.headings);
            ctx.renderer.set_rendered(&doc.record.slug, out.content.clone());
            doc.content = out.content;
            doc.nav_heading = out.nav_heading;
        }
        Ok(())
    }
}
