//! Request-time rendering of built output.
//!
//! Deferred `!{…}` spans come out of a build as `${…}`; [`ViewEngine`]
//! evaluates them per request with `data` bound to the request context.

use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use super::builder::BuildError;
use super::template::{TemplateMap, TemplateRenderer};

/// Renders built files against request data, as a server view engine would.
pub struct ViewEngine {
    template_dir: PathBuf,
    templates: TemplateMap,
}

impl ViewEngine {
    /// `include()` calls made at request time resolve under `template_dir`.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            templates: TemplateMap::default(),
        }
    }

    /// Read `path` and evaluate its expressions with `data` as the request context.
    pub async fn render_file(&self, path: &Path, data: &Json) -> Result<String, BuildError> {
        let text = tokio::fs::read_to_string(path).await?;
        let renderer = TemplateRenderer::new(&self.templates, &self.template_dir);
        let name = path.display().to_string();
        Ok(renderer.render(&name, &text, data, &Json::Null)?)
    }
}
