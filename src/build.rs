mod aggregate;
mod builder;
mod cache;
mod expr;
mod headings;
mod highlight;
mod hooks;
mod markdown;
mod minify;
mod nav;
mod paginate;
mod paths;
pub mod pipeline;
mod record;
mod scan;
mod template;
mod view;
mod watch;

pub use builder::{BuildError, BuildResult, Builder};
pub use highlight::SyntaxHighlighter;
pub use view::ViewEngine;
pub use watch::{FileWatcher, watch_and_rebuild};
