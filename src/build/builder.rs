use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::{ConfigError, SiteConfig};
use crate::log;

use super::aggregate::SiteAggregate;
use super::cache::HashCache;
use super::highlight::SyntaxHighlighter;
use super::hooks::Hooks;
use super::paths::{has_parent_traversal, relative_name};
use super::pipeline::{Pipeline, PipelineContext, PipelineError, ProcessingDocument, RenderStats};
use super::record::{ContentRecord, RecordBuilder, RecordError};
use super::template::{TemplateError, TemplateMap, TemplateRenderer};

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("duplicate slug '{slug}' from {first} and {second}")]
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("render failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct BuildResult {
    pub build_dir: PathBuf,
    pub records: usize,
    pub templates: usize,
    pub written: usize,
    pub unchanged: usize,
    pub copied: usize,
}

/// Where a changed path belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Content(String),
    Template(String),
    PassThrough,
}

/// Owns the content records, templates and hash cache of one site.
///
/// Records and templates change only through [`Builder::add_content`] and
/// [`Builder::add_template`]; [`Builder::render`] runs a full render pass
/// over the current state.
pub struct Builder {
    config: SiteConfig,
    highlighter: SyntaxHighlighter,
    hooks: Hooks,
    pipeline: Pipeline,
    /// filename -> record
    records: BTreeMap<String, ContentRecord>,
    templates: TemplateMap,
    cache: HashCache,
}

impl Builder {
    /// Create a builder for a config whose paths are already resolved.
    pub fn new(config: SiteConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self {
            config,
            highlighter: SyntaxHighlighter::default(),
            hooks: Hooks::default(),
            pipeline: Pipeline::default_pipeline(),
            records: BTreeMap::new(),
            templates: TemplateMap::default(),
            cache: HashCache::new(),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    #[allow(dead_code)]
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    #[allow(dead_code)]
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    pub fn record(&self, filename: &str) -> Option<&ContentRecord> {
        self.records.get(filename)
    }

    /// Add, replace (`Some`) or remove (`None`) the record for a content file.
    pub fn add_content(&mut self, filename: &str, text: Option<&str>) -> Result<(), BuildError> {
        if has_parent_traversal(filename) {
            return Err(RecordError::ParentTraversal(filename.to_string()).into());
        }
        let Some(text) = text else {
            if let Some(old) = self.records.remove(filename) {
                self.cache.forget(&old.slug);
            }
            return Ok(());
        };

        let mut record = RecordBuilder::new(&self.config, &self.highlighter).build(filename, text)?;
        self.hooks.content_ingested(&mut record);
        self.records.insert(filename.to_string(), record);
        Ok(())
    }

    /// Add, replace (`Some`) or remove (`None`) a template.
    pub fn add_template(&mut self, name: &str, text: Option<String>) -> Result<(), BuildError> {
        if has_parent_traversal(name) {
            return Err(RecordError::ParentTraversal(name.to_string()).into());
        }
        match text {
            Some(text) => {
                let text = self.hooks.template_ingested(name, text);
                self.templates.insert(name, text);
            }
            None => {
                self.templates.remove(name);
            }
        }
        Ok(())
    }

    /// Read every content and template file, concurrently.
    ///
    /// A file that cannot be read is logged and left out.
    pub async fn read_all(&mut self) -> Result<(), BuildError> {
        let templates = read_tree(&self.config.template_dir).await;
        for (name, text) in templates {
            self.add_template(&name, Some(text))?;
        }

        let contents = read_tree(&self.config.content_dir).await;
        for (filename, text) in &contents {
            self.add_content(filename, Some(text.as_str()))?;
        }

        log!("build"; "read {} content file(s), {} template(s)", self.records.len(), self.templates.len());
        Ok(())
    }

    /// Read everything, render, and copy pass-through directories.
    pub async fn build(&mut self) -> Result<BuildResult, BuildError> {
        self.read_all().await?;
        let stats = self.render()?;
        let copied = self.copy_pass_through()?;

        Ok(BuildResult {
            build_dir: self.config.build_dir.clone(),
            records: self.records.len(),
            templates: self.templates.len(),
            written: stats.written,
            unchanged: stats.unchanged,
            copied,
        })
    }

    /// Re-read the given changed paths, then run a fresh render pass.
    pub async fn rebuild(&mut self, paths: &[PathBuf]) -> Result<RenderStats, BuildError> {
        let mut pass_through = false;
        for path in paths {
            let Some(kind) = self.classify(path) else {
                continue;
            };
            match kind {
                SourceKind::Content(filename) => {
                    let text = read_changed(path).await;
                    self.add_content(&filename, text.as_deref())?;
                }
                SourceKind::Template(name) => {
                    let text = read_changed(path).await;
                    self.add_template(&name, text)?;
                }
                SourceKind::PassThrough => pass_through = true,
            }
        }

        let stats = self.render()?;
        if pass_through {
            self.copy_pass_through()?;
        }
        Ok(stats)
    }

    /// Map a changed path to the content file, template or static directory it belongs to.
    pub fn classify(&self, path: &Path) -> Option<SourceKind> {
        if is_ignored(path) {
            return None;
        }
        if let Some(name) = relative_to(path, &self.config.template_dir) {
            return Some(SourceKind::Template(name));
        }
        if let Some(name) = relative_to(path, &self.config.content_dir) {
            return Some(SourceKind::Content(name));
        }
        self.config
            .pass_through
            .iter()
            .any(|entry| relative_to(path, &entry.from).is_some())
            .then_some(SourceKind::PassThrough)
    }

    /// Run one full render pass over the current records and templates.
    pub fn render(&mut self) -> Result<RenderStats, BuildError> {
        check_unique_slugs(self.records.values())?;

        let mut published: Vec<ContentRecord> = self
            .records
            .values()
            .filter(|record| record.publish)
            .cloned()
            .collect();

        let aggregate = SiteAggregate::build(&mut published, &self.config);
        // Listing pages must not land on a real record's slug
        check_unique_slugs(published.iter())?;
        for record in &mut published {
            self.hooks.pre_render(record, &aggregate);
        }
        let tacs = aggregate.to_json();

        let renderer = TemplateRenderer::new(&self.templates, &self.config.template_dir);
        let mut docs: Vec<ProcessingDocument> =
            published.into_iter().map(ProcessingDocument::new).collect();

        let mut ctx =
            PipelineContext::new(&self.config, &tacs, &renderer, &self.hooks, &mut self.cache);
        self.pipeline.run(&mut docs, &mut ctx)?;
        let stats = ctx.stats;

        log!("build"; "rendered {} file(s): {} written, {} unchanged",
            docs.len(), stats.written, stats.unchanged);
        Ok(stats)
    }

    /// Copy every pass-through directory into the build root.
    pub fn copy_pass_through(&self) -> Result<usize, BuildError> {
        let mut copied = 0;
        for entry in &self.config.pass_through {
            if !entry.from.exists() {
                log!("warn"; "pass-through directory {} does not exist", entry.from.display());
                continue;
            }
            let target = self.config.build_dir.join(&entry.to);
            for file in collect_all_files(&entry.from) {
                let Ok(relative) = file.strip_prefix(&entry.from) else {
                    continue;
                };
                let output = target.join(relative);
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&file, &output)?;
                copied += 1;
            }
        }
        if copied > 0 {
            log!("build"; "copied {} pass-through file(s)", copied);
        }
        Ok(copied)
    }
}

fn check_unique_slugs<'a>(
    records: impl Iterator<Item = &'a ContentRecord>,
) -> Result<(), BuildError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for record in records {
        if let Some(first) = seen.insert(&record.slug, &record.filename) {
            return Err(BuildError::DuplicateSlug {
                slug: record.slug.clone(),
                first: first.to_string(),
                second: record.filename.clone(),
            });
        }
    }
    Ok(())
}

/// Collect all files from a directory recursively
fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| !is_ignored(path))
        .collect()
}

/// Hidden and system files never become records or templates.
fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.') || IGNORED_FILES.contains(&name))
}

/// Path relative to `root`, trying the canonical form of both when the
/// literal prefix does not match (watch events report canonical paths).
fn relative_to(path: &Path, root: &Path) -> Option<String> {
    if let Some(name) = relative_name(path, root) {
        return Some(name);
    }
    let root = root.canonicalize().ok()?;
    let path = path
        .canonicalize()
        .ok()
        .or_else(|| {
            // Deleted files cannot be canonicalized; resolve their parent instead
            let parent = path.parent()?.canonicalize().ok()?;
            Some(parent.join(path.file_name()?))
        })?;
    relative_name(&path, &root)
}

/// Read every file under `root` concurrently, keyed by relative name.
async fn read_tree(root: &Path) -> Vec<(String, String)> {
    if !root.exists() {
        log!("warn"; "directory {} does not exist", root.display());
        return Vec::new();
    }

    let mut tasks = JoinSet::new();
    for path in collect_all_files(root) {
        let Some(name) = relative_name(&path, root) else {
            continue;
        };
        tasks.spawn(async move {
            let result = tokio::fs::read_to_string(&path).await;
            (name, path, result)
        });
    }

    let mut files = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, _, Ok(text))) => files.push((name, text)),
            Ok((_, path, Err(e))) => log!("warn"; "failed to read {}: {}", path.display(), e),
            Err(e) => log!("warn"; "read task failed: {}", e),
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

/// Contents of a changed file, or `None` if it is gone or unreadable.
async fn read_changed(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            log!("warn"; "failed to read {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassThrough;
    use tempfile::TempDir;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::default().resolve_paths(dir.path());
        std::fs::create_dir_all(&config.content_dir).unwrap();
        std::fs::create_dir_all(&config.template_dir).unwrap();
        (dir, config)
    }

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn new_builder(config: &SiteConfig) -> Builder {
        let mut builder = Builder::new(config.clone()).unwrap();
        builder
            .add_template(
                "default.html",
                Some("<html><title>${ data.title }</title><body>${ data.content }</body></html>".to_string()),
            )
            .unwrap();
        builder
            .add_template(
                "list.html",
                Some("<ul>${ data.pagination.page.map(p => `<li>${ p.title }</li>`) }</ul>".to_string()),
            )
            .unwrap();
        builder
    }

    fn output(config: &SiteConfig, slug: &str) -> String {
        std::fs::read_to_string(config.build_dir.join(slug)).unwrap()
    }

    #[tokio::test]
    async fn test_full_build() {
        let (_dir, config) = site();
        write(
            &config.content_dir.join("post/hello.md"),
            "---\ntitle: Hello\n---\n## Intro\n\nPosted in ${ data.directory }.\n",
        );
        write(&config.content_dir.join("index.md"), "# Home\n");
        write(
            &config.template_dir.join("default.html"),
            "<h1>${ data.title }</h1>${ include('partials/nav.html') }${ data.content }",
        );
        write(
            &config.template_dir.join("partials/nav.html"),
            "<nav>${ tacs.nav.map(n => n.title).join(',') }</nav>",
        );
        write(&config.template_dir.join("list.html"), "${ data.pagination.page.length } posts");

        let mut builder = Builder::new(config.clone()).unwrap();
        let result = builder.build().await.unwrap();
        assert_eq!(result.records, 2);
        assert_eq!(result.templates, 3);

        let hello = output(&config, "post/hello/index.html");
        assert!(hello.starts_with("<h1>Hello</h1><nav>Post</nav>"));
        assert!(hello.contains("<h2 id=\"intro\">Intro"));
        assert!(hello.contains("Posted in post."));

        assert_eq!(output(&config, "post/index.html"), "1 posts");
        assert!(output(&config, "index.html").contains("Home</h1>"));
    }

    #[test]
    fn test_hash_gated_writes() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("a.md", Some("A")).unwrap();
        builder.add_content("b.md", Some("B")).unwrap();

        let first = builder.render().unwrap();
        assert_eq!(first.written, 2);

        let second = builder.render().unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 2);

        builder.add_content("a.md", Some("A!")).unwrap();
        let third = builder.render().unwrap();
        assert_eq!(third.written, 1);
        assert!(output(&config, "a/index.html").contains("A!"));
    }

    #[test]
    fn test_duplicate_slug_is_fatal() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("about.md", Some("a")).unwrap();
        builder.add_content("about.html", Some("b")).unwrap();
        match builder.render() {
            Err(BuildError::DuplicateSlug { slug, first, second }) => {
                assert_eq!(slug, "about/index.html");
                assert_eq!(first, "about.html");
                assert_eq!(second, "about.md");
            }
            other => panic!("expected duplicate slug, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_listing_page_cannot_replace_page() {
        let (_dir, mut config) = site();
        config.dir_pages.size = 2;
        let mut builder = new_builder(&config);
        builder.add_content("post/1.md", Some("REAL PAGE")).unwrap();
        builder.add_content("post/a.md", Some("A")).unwrap();
        builder.add_content("post/b.md", Some("B")).unwrap();

        match builder.render() {
            Err(BuildError::DuplicateSlug { slug, first, .. }) => {
                assert_eq!(slug, "post/1/index.html");
                assert_eq!(first, "post/1.md");
            }
            other => panic!("expected duplicate slug, got {:?}", other.map(|_| ())),
        }
        assert!(!config.build_dir.join("post/1/index.html").exists());
    }

    #[test]
    fn test_inserted_stage_runs() {
        use crate::build::pipeline::Stage;

        struct Footer;

        impl Stage for Footer {
            fn name(&self) -> &'static str {
                "footer"
            }

            fn process(
                &self,
                docs: &mut [ProcessingDocument],
                _ctx: &mut PipelineContext,
            ) -> Result<(), PipelineError> {
                for doc in docs {
                    if let Some(output) = doc.output.as_mut() {
                        output.push_str("<footer></footer>");
                    }
                }
                Ok(())
            }
        }

        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.pipeline_mut().insert_before("write", Footer).unwrap();
        builder.add_content("about.md", Some("x")).unwrap();
        builder.render().unwrap();

        assert!(output(&config, "about/index.html").ends_with("<footer></footer>"));
    }

    #[test]
    fn test_traversal_is_fatal() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        assert!(matches!(
            builder.add_content("../secret.md", Some("x")),
            Err(BuildError::Record(RecordError::ParentTraversal(_)))
        ));
        assert!(builder.add_template("../x.html", Some(String::new())).is_err());
    }

    #[test]
    fn test_remove_content_and_template() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("a.md", Some("A")).unwrap();
        assert!(builder.record("a.md").is_some());
        builder.add_content("a.md", None).unwrap();
        assert!(builder.record("a.md").is_none());

        builder.add_template("default.html", None).unwrap();
        builder.add_content("b.md", Some("plain")).unwrap();
        builder.render().unwrap();
        assert_eq!(output(&config, "b/index.html"), "<p>plain</p>\n");
    }

    #[test]
    fn test_drafts_and_development() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("draft.md", Some("---\npublish: draft\n---\nx")).unwrap();
        builder.render().unwrap();
        assert!(!config.build_dir.join("draft/index.html").exists());

        let dev = SiteConfig {
            development: true,
            ..config.clone()
        };
        let mut builder = new_builder(&dev);
        builder.add_content("draft.md", Some("---\npublish: draft\n---\nx")).unwrap();
        builder.render().unwrap();
        assert!(dev.build_dir.join("draft/index.html").exists());
    }

    #[test]
    fn test_content_rendered_and_deferred() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("post/a.md", Some("Body ${ 1 + 1 } !{ req.user }")).unwrap();
        builder
            .add_content(
                "feed.xml",
                Some("<feed>\n  ${ tacs.dir.post.map(p => p.contentRendered) }\n</feed>"),
            )
            .unwrap();
        builder.render().unwrap();

        assert_eq!(output(&config, "feed.xml"), "<feed><p>Body 2 ${ req.user }</p></feed>");
        assert!(output(&config, "post/a/index.html").contains("Body 2 ${ req.user }"));
    }

    #[test]
    fn test_hooks() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder
            .hooks_mut()
            .on_content_ingested(|record| record.title = record.title.to_uppercase())
            .on_post_render(|_, out| format!("{out}<!-- built -->"));
        builder.add_content("about.md", Some("x")).unwrap();
        builder.render().unwrap();

        let html = output(&config, "about/index.html");
        assert!(html.contains("<title>ABOUT</title>"));
        assert!(html.ends_with("<!-- built -->"));
    }

    #[test]
    fn test_syntax_error_names_file() {
        let (_dir, config) = site();
        let mut builder = new_builder(&config);
        builder.add_content("bad.md", Some("${ data. }")).unwrap();
        let err = builder.render().unwrap_err().to_string();
        assert!(err.contains("bad.md"), "{err}");
    }

    #[tokio::test]
    async fn test_rebuild_changed_paths() {
        let (_dir, config) = site();
        let page = config.content_dir.join("a.md");
        write(&page, "one");
        write(&config.template_dir.join("default.html"), "${ data.content }");

        let mut builder = Builder::new(config.clone()).unwrap();
        builder.build().await.unwrap();

        write(&page, "two");
        let stats = builder.rebuild(std::slice::from_ref(&page)).await.unwrap();
        assert_eq!(stats.written, 1);
        assert!(output(&config, "a/index.html").contains("two"));

        std::fs::remove_file(&page).unwrap();
        builder.rebuild(&[page]).await.unwrap();
        assert!(builder.record("a.md").is_none());
    }

    #[test]
    fn test_classify() {
        let (_dir, mut config) = site();
        config.pass_through.push(PassThrough {
            from: config.content_dir.parent().unwrap().join("media"),
            to: PathBuf::from("media"),
        });
        let builder = Builder::new(config.clone()).unwrap();

        assert_eq!(
            builder.classify(&config.content_dir.join("post/a.md")),
            Some(SourceKind::Content("post/a.md".to_string()))
        );
        assert_eq!(
            builder.classify(&config.template_dir.join("list.html")),
            Some(SourceKind::Template("list.html".to_string()))
        );
        assert_eq!(
            builder.classify(&config.pass_through[0].from.join("logo.png")),
            Some(SourceKind::PassThrough)
        );
        assert_eq!(builder.classify(&config.content_dir.join(".hidden.md")), None);
        assert_eq!(builder.classify(Path::new("/elsewhere/x.md")), None);
    }

    #[test]
    fn test_pass_through_copy() {
        let (dir, mut config) = site();
        let media = dir.path().join("src/media");
        write(&media.join("img/logo.svg"), "<svg/>");
        config.pass_through.push(PassThrough {
            from: media,
            to: PathBuf::from("media"),
        });

        let builder = Builder::new(config.clone()).unwrap();
        assert_eq!(builder.copy_pass_through().unwrap(), 1);
        assert_eq!(output(&config, "media/img/logo.svg"), "<svg/>");
    }
}
