//! Content expansion stage.
//!
//! Evaluates the immediate expressions in each record body and publishes
//! the result to the rendered-content table read by `contentRendered`.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that expands expressions in record bodies.
///
/// Documents are reordered by `renderPriority` first, so a record that
/// reads other records' `contentRendered` runs after them. This is a
/// single extra bucket, not a dependency graph: two such records reading
/// each other still see whatever was rendered first.
pub struct ContentStage;

impl Stage for ContentStage {
    fn name(&self) -> &'static str {
        "content"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        docs.sort_by_key(|doc| doc.record.render_priority);

        for doc in docs {
            let expanded =
                ctx.renderer
                    .expand(&doc.record.filename, &doc.content, &doc.data, ctx.tacs)?;
            ctx.renderer.set_rendered(&doc.record.slug, expanded.clone());
            doc.content = expanded;
        }

        Ok(())
    }
}
