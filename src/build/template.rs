//! Expression template rendering.
//!
//! `${…}` spans are evaluated against the record and site aggregate;
//! `!{…}` spans survive expansion untouched and are rewritten to `${…}`
//! once the output is final, for a later request-time render.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use super::expr::{self, Env, ExprError, Host};
use super::scan;
use crate::log;

/// Substitution passes before a render is abandoned.
pub const MAX_PASSES: usize = 50;

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("{file}: {source}")]
    Expression {
        file: String,
        #[source]
        source: ExprError,
    },
}

/// Raw template text by name (path relative to the template root).
#[derive(Debug, Clone, Default)]
pub struct TemplateMap {
    templates: BTreeMap<String, String>,
}

impl TemplateMap {
    pub fn insert(&mut self, name: impl Into<String>, text: String) {
        self.templates.insert(name.into(), text);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.templates.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }
}

/// Renders template text for one render pass.
///
/// Holds the include cache and the rendered-content table, so it lives
/// exactly as long as the pass that created it.
pub struct TemplateRenderer<'a> {
    templates: &'a TemplateMap,
    template_dir: PathBuf,
    rendered: RefCell<HashMap<String, String>>,
    include_cache: RefCell<HashMap<String, String>>,
    include_depth: Cell<usize>,
    /// Set when a nested include hits the cap; the whole expansion is dropped
    capped: Cell<bool>,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(templates: &'a TemplateMap, template_dir: &Path) -> Self {
        Self {
            templates,
            template_dir: template_dir.to_path_buf(),
            rendered: RefCell::new(HashMap::new()),
            include_cache: RefCell::new(HashMap::new()),
            include_depth: Cell::new(0),
            capped: Cell::new(false),
        }
    }

    /// Record a slug's final body so `contentRendered` lookups can see it.
    pub fn set_rendered(&self, slug: &str, html: String) {
        self.rendered.borrow_mut().insert(slug.to_string(), html);
    }

    pub fn template(&self, name: &str) -> Option<&'a str> {
        self.templates.get(name)
    }

    /// Evaluate immediate expressions, leaving deferred spans in place.
    ///
    /// Exceeding [`MAX_PASSES`], in passes or in include nesting, yields an
    /// empty string and a warning.
    pub fn expand(
        &self,
        file: &str,
        text: &str,
        data: &Json,
        tacs: &Json,
    ) -> Result<String, TemplateError> {
        let env = Env {
            data,
            tacs,
            host: self,
        };
        self.capped.set(false);
        let expanded = self
            .expand_passes(text, env)
            .map_err(|source| TemplateError::Expression {
                file: file.to_string(),
                source,
            })?;

        match expanded {
            Some(text) if !self.capped.replace(false) => Ok(text),
            _ => {
                log!("warn"; "{file}: expansion exceeded {MAX_PASSES} passes, output dropped");
                Ok(String::new())
            }
        }
    }

    /// Expand, then rewrite deferred markers for the next render stage.
    pub fn render(
        &self,
        file: &str,
        text: &str,
        data: &Json,
        tacs: &Json,
    ) -> Result<String, TemplateError> {
        let expanded = self.expand(file, text, data, tacs)?;
        Ok(scan::rewrite_deferred(&expanded))
    }

    /// Substitute repeatedly until the text stops changing length.
    fn expand_passes(&self, text: &str, env: Env<'_>) -> Result<Option<String>, ExprError> {
        let mut current = substitute(text, env)?;
        if current.len() == text.len() {
            return Ok(Some(current));
        }
        for _ in 1..MAX_PASSES {
            let next = substitute(&current, env)?;
            if next.len() == current.len() {
                return Ok(Some(next));
            }
            current = next;
        }
        Ok(None)
    }

    fn load(&self, path: &str) -> Result<String, ExprError> {
        let name = path.trim_start_matches("./").trim_start_matches('/');
        if let Some(text) = self.templates.get(name) {
            return Ok(text.to_string());
        }
        if let Some(text) = self.include_cache.borrow().get(name) {
            return Ok(text.clone());
        }

        if Path::new(name)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ExprError::Include {
                path: path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path escapes the template root",
                ),
            });
        }

        let text = std::fs::read_to_string(self.template_dir.join(name)).map_err(|source| {
            ExprError::Include {
                path: path.to_string(),
                source,
            }
        })?;
        self.include_cache
            .borrow_mut()
            .insert(name.to_string(), text.clone());
        Ok(text)
    }
}

impl Host for TemplateRenderer<'_> {
    fn include(&self, path: &str, env: Env<'_>) -> Result<String, ExprError> {
        let depth = self.include_depth.get();
        if self.capped.get() {
            return Ok(String::new());
        }
        if depth >= MAX_PASSES {
            log!("warn"; "include '{path}' nested more than {MAX_PASSES} deep");
            self.capped.set(true);
            return Ok(String::new());
        }

        let text = self.load(path)?;
        self.include_depth.set(depth + 1);
        let expanded = self.expand_passes(&text, env);
        self.include_depth.set(depth);

        Ok(expanded?.unwrap_or_else(|| {
            self.capped.set(true);
            String::new()
        }))
    }

    fn rendered(&self, slug: &str) -> Option<String> {
        self.rendered.borrow().get(slug).cloned()
    }
}

/// One substitution pass over every immediate span.
fn substitute(text: &str, env: Env<'_>) -> Result<String, ExprError> {
    let scan = scan::scan(text);
    if scan.expressions.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    for (i, segment) in scan.segments.iter().enumerate() {
        out.push_str(segment);
        if let Some(span) = scan.expressions.get(i) {
            if scan::is_deferred(span) {
                out.push_str(span);
            } else {
                out.push_str(&expr::evaluate(scan::body(span), env)?);
            }
        }
    }
    Ok(out)
}
