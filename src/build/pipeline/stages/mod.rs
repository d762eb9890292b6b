//! Default pipeline stages.
//!
//! The standard render pipeline consists of:
//!
//! 1. **ContentStage** - Expand `${…}` in record bodies, lowest `renderPriority` first
//! 2. **HeadingsStage** - Heading ids, permalinks and the contents list
//! 3. **TemplateStage** - Wrap content in the record's template
//! 4. **FinalizeStage** - Splice contents, rewrite deferred markers, run hooks, minify
//! 5. **WriteStage** - Write changed outputs to the build directory

mod content;
mod finalize;
mod headings;
mod template;
mod write;

pub use content::ContentStage;
pub use finalize::FinalizeStage;
pub use headings::HeadingsStage;
pub use template::TemplateStage;
pub use write::WriteStage;
