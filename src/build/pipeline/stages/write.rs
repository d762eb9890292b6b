//! File writing stage.

use crate::build::paths::slug_to_output_path;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that writes changed outputs to the build directory.
///
/// An output is written only when its digest differs from the one
/// recorded for the slug by the last successful write, so an unchanged
/// rebuild touches no files. Parent directories are created as needed.
pub struct WriteStage;

impl Stage for WriteStage {
    fn name(&self) -> &'static str {
        "write"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs {
            let output = doc.output.as_ref().ok_or_else(|| {
                PipelineError::stage(
                    "write",
                    format!("{} has no output (was the finalize stage run?)", doc.slug()),
                )
            })?;

            let Some(hash) = ctx.cache.check(doc.slug(), output) else {
                ctx.stats.unchanged += 1;
                continue;
            };

            let path = slug_to_output_path(doc.slug(), ctx.build_dir).ok_or_else(|| {
                PipelineError::stage(
                    "write",
                    format!("slug '{}' resolves outside the build root", doc.slug()),
                )
            })?;
            let write_error = |source| PipelineError::Write {
                path: path.display().to_string(),
                source,
            };

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(write_error)?;
            }
            std::fs::write(&path, output).map_err(write_error)?;

            ctx.cache.record(doc.slug(), hash);
            ctx.stats.written += 1;
        }

        Ok(())
    }
}
