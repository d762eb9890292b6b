//! Pipeline context for sharing state across stages.

use std::path::Path;

use serde_json::Value as Json;

use crate::build::cache::HashCache;
use crate::build::hooks::Hooks;
use crate::build::template::TemplateRenderer;
use crate::config::SiteConfig;

/// Write counts for one render pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub written: usize,
    pub unchanged: usize,
}

/// Shared context for pipeline stages.
///
/// Everything here lives for exactly one render pass except the hash
/// cache, which carries digests from one pass to the next.
pub struct PipelineContext<'a> {
    pub config: &'a SiteConfig,

    /// Directory where output files are written
    pub build_dir: &'a Path,

    /// The site aggregate as seen by expressions (`tacs`)
    pub tacs: &'a Json,

    pub renderer: &'a TemplateRenderer<'a>,

    pub hooks: &'a Hooks,

    pub cache: &'a mut HashCache,

    pub stats: RenderStats,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        config: &'a SiteConfig,
        tacs: &'a Json,
        renderer: &'a TemplateRenderer<'a>,
        hooks: &'a Hooks,
        cache: &'a mut HashCache,
    ) -> Self {
        Self {
            config,
            build_dir: &config.build_dir,
            tacs,
            renderer,
            hooks,
            cache,
            stats: RenderStats::default(),
        }
    }
}
