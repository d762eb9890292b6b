//! Content records: one per source file, the data model every template sees.

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as Json};

use super::highlight::SyntaxHighlighter;
use super::markdown::{self, MarkdownError};
use super::paths;
use crate::config::SiteConfig;
use crate::util::{normalize_ref, parse_date, title_case, word_count};

/// Default `priority` for records that do not set one.
pub const DEFAULT_PRIORITY: f64 = 0.1;

/// Text whose presence marks a record as depending on other records' output.
const CONTENT_RENDERED: &str = "contentRendered";

/// Front matter keys read into a dedicated field, plus derived field names
/// that front matter must not shadow.
const RESERVED_KEYS: &[&str] = &[
    "title",
    "description",
    "date",
    "priority",
    "publish",
    "index",
    "tags",
    "template",
    "menu",
    "slug",
    "filename",
    "link",
    "directory",
    "content",
    "contentRendered",
    "renderPriority",
    "wordCount",
    "pagination",
    "postback",
    "postnext",
];

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("filename '{0}' contains a parent-directory segment")]
    ParentTraversal(String),

    #[error("slug '{slug}' of {filename} resolves outside the build root")]
    SlugOutsideRoot { slug: String, filename: String },

    #[error("{filename}: {source}")]
    Markdown {
        filename: String,
        source: MarkdownError,
    },
}

/// One source file (or a synthetic listing page) ready for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub filename: String,
    pub slug: String,
    pub link: String,
    pub directory: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub priority: f64,
    pub publish: bool,
    pub index: IndexFrequency,
    pub tags: Vec<TagRef>,
    pub menu: MenuSetting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(rename = "isHTML")]
    pub is_html: bool,
    #[serde(rename = "isXML")]
    pub is_xml: bool,
    #[serde(rename = "isMD")]
    pub is_md: bool,
    #[serde(rename = "isCSS")]
    pub is_css: bool,
    #[serde(rename = "isJS")]
    pub is_js: bool,
    #[serde(rename = "isJSON")]
    pub is_json: bool,
    /// Body converted to HTML (markdown) or as written, before any expansion
    pub content: String,
    pub render_priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub postback: Option<AdjacentLink>,
    pub postnext: Option<AdjacentLink>,
    /// Remaining front matter keys, exposed on `data` as written
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

/// Search-engine indexing frequency, or `false` to opt out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexFrequency {
    Enabled(String),
    Disabled(bool),
}

impl IndexFrequency {
    pub fn is_enabled(&self) -> bool {
        matches!(self, IndexFrequency::Enabled(_))
    }
}

/// Navigation menu participation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MenuSetting {
    Shown(bool),
    Title(String),
}

impl MenuSetting {
    pub fn is_hidden(&self) -> bool {
        matches!(self, MenuSetting::Shown(false))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRef {
    pub tag: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Link to a neighbouring record in a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjacentLink {
    pub slug: String,
    pub link: String,
    pub title: String,
}

/// Listing page state, present only on synthetic listing records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Records on this page
    pub page: Vec<Json>,
    pub page_total: usize,
    pub page_current: usize,
    pub page_current1: usize,
    pub subpage_from1: usize,
    pub subpage_to1: usize,
    pub href_back: Option<String>,
    pub href_next: Option<String>,
    pub href: Vec<String>,
}

impl ContentRecord {
    /// A bare record with defaults, used for synthetic pages.
    pub fn synthetic(slug: &str, config: &SiteConfig) -> Self {
        ContentRecord {
            filename: slug.to_string(),
            slug: slug.to_string(),
            link: paths::slug_to_link(slug, &config.root, &config.index_filename),
            directory: paths::slug_directory(slug),
            title: String::new(),
            description: None,
            date: None,
            priority: DEFAULT_PRIORITY,
            publish: true,
            index: IndexFrequency::Enabled("monthly".to_string()),
            tags: Vec::new(),
            menu: MenuSetting::Shown(true),
            template: None,
            is_html: true,
            is_xml: false,
            is_md: false,
            is_css: false,
            is_js: false,
            is_json: false,
            content: String::new(),
            render_priority: 0,
            word_count: None,
            pagination: None,
            postback: None,
            postnext: None,
            extra: Map::new(),
        }
    }

    /// Whether this record is the index page of its directory.
    pub fn is_directory_index(&self, index_filename: &str) -> bool {
        !self.directory.is_empty() && self.slug == format!("{}/{}", self.directory, index_filename)
    }
}

// =============================================================================
// Front matter
// =============================================================================

/// Split leading front matter from a file's text.
///
/// The block opens with a line equal to `delimiter` and closes at the next
/// such line. Without both lines the whole text is content.
pub fn split_front_matter<'t>(text: &'t str, delimiter: &str) -> (Map<String, Json>, &'t str) {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    let mut lines = trimmed.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return (Map::new(), text);
    };
    if first.trim() != delimiter {
        return (Map::new(), text);
    }

    let mut offset = first.len();
    let mut block = Vec::new();
    for line in lines {
        offset += line.len();
        if line.trim() == delimiter {
            return (parse_front_matter_lines(&block), &trimmed[offset..]);
        }
        block.push(line);
    }

    (Map::new(), text)
}

/// Parse `key: value` lines. A key with nothing after the colon is `true`.
fn parse_front_matter_lines(lines: &[&str]) -> Map<String, Json> {
    let mut map = Map::new();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        let value = value.trim();
        let value = if value.is_empty() {
            Json::Bool(true)
        } else {
            Json::String(unquote(value).to_string())
        };
        map.insert(key.to_string(), value);
    }
    map
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn fm_str<'m>(fm: &'m Map<String, Json>, key: &str) -> Option<&'m str> {
    fm.get(key).and_then(Json::as_str)
}

fn fm_is_false(fm: &Map<String, Json>, key: &str) -> bool {
    match fm.get(key) {
        Some(Json::Bool(b)) => !b,
        Some(Json::String(s)) => s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

// =============================================================================
// Record builder
// =============================================================================

/// Builds records from source files for one site configuration.
pub struct RecordBuilder<'a> {
    config: &'a SiteConfig,
    highlighter: &'a SyntaxHighlighter,
    slug_replace: Vec<(Regex, String)>,
    now: NaiveDateTime,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(config: &'a SiteConfig, highlighter: &'a SyntaxHighlighter) -> Self {
        // Patterns were checked when the config was validated
        let slug_replace = config
            .slug_replace
            .iter()
            .filter_map(|rule| {
                Regex::new(&rule.pattern)
                    .ok()
                    .map(|re| (re, rule.replace.clone()))
            })
            .collect();
        Self {
            config,
            highlighter,
            slug_replace,
            now: Local::now().naive_local(),
        }
    }

    /// Fix the clock used for future-date publish checks.
    #[cfg(test)]
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn slugify(&self, filename: &str) -> String {
        paths::slugify(filename, &self.config.index_filename, &self.slug_replace)
    }

    /// Build the record for `filename` (relative to the content root).
    pub fn build(&self, filename: &str, raw: &str) -> Result<ContentRecord, RecordError> {
        if paths::has_parent_traversal(filename) {
            return Err(RecordError::ParentTraversal(filename.to_string()));
        }

        let config = self.config;
        let (fm, body) = split_front_matter(raw, &config.front_matter_delimiter);
        let ext = paths::extension(filename);
        let page_like = paths::is_page_like(filename);

        let slug = match fm_str(&fm, "slug") {
            Some(explicit) => explicit.trim().trim_start_matches('/').to_string(),
            None => self.slugify(filename),
        };
        if !paths::is_contained(&slug) {
            return Err(RecordError::SlugOutsideRoot {
                slug,
                filename: filename.to_string(),
            });
        }

        let content = if ext == "md" {
            markdown::to_html(body, self.highlighter, &config.markdown).map_err(|source| {
                RecordError::Markdown {
                    filename: filename.to_string(),
                    source,
                }
            })?
        } else {
            body.to_string()
        };

        let index = if fm_is_false(&fm, "index") {
            IndexFrequency::Disabled(false)
        } else {
            match fm_str(&fm, "index") {
                Some(freq) => IndexFrequency::Enabled(freq.to_string()),
                None if page_like => IndexFrequency::Enabled("monthly".to_string()),
                None => IndexFrequency::Disabled(false),
            }
        };

        let menu = if fm_is_false(&fm, "menu") {
            MenuSetting::Shown(false)
        } else {
            match fm_str(&fm, "menu") {
                Some(title) if !title.eq_ignore_ascii_case("true") => {
                    MenuSetting::Title(title.to_string())
                }
                _ => MenuSetting::Shown(true),
            }
        };

        let word_count = (page_like && index.is_enabled()).then(|| word_count(&content));
        let render_priority = u8::from(content.contains(CONTENT_RENDERED));

        let extra = fm
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(ContentRecord {
            filename: filename.to_string(),
            link: paths::slug_to_link(&slug, &config.root, &config.index_filename),
            directory: paths::slug_directory(&slug),
            title: fm_str(&fm, "title")
                .map(str::to_string)
                .unwrap_or_else(|| default_title(&slug, &config.index_filename)),
            description: fm_str(&fm, "description").map(str::to_string),
            date: fm_str(&fm, "date").and_then(parse_date),
            priority: fm_str(&fm, "priority")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PRIORITY),
            publish: config.development || self.is_published(&fm),
            index,
            tags: self.tags(fm_str(&fm, "tags").unwrap_or_default()),
            menu,
            template: fm_str(&fm, "template")
                .map(str::to_string)
                .or_else(|| page_like.then(|| config.default_template.clone())),
            is_html: page_like,
            is_xml: ext == "xml",
            is_md: ext == "md",
            is_css: ext == "css",
            is_js: ext == "js",
            is_json: ext == "json",
            content,
            render_priority,
            word_count,
            pagination: None,
            postback: None,
            postnext: None,
            extra,
            slug,
        })
    }

    /// `publish: draft`/`false`, or a future `publish` date, hides a record.
    fn is_published(&self, fm: &Map<String, Json>) -> bool {
        match fm.get("publish") {
            Some(Json::Bool(b)) => *b,
            Some(Json::String(value)) => {
                let value = value.trim();
                if value.eq_ignore_ascii_case("draft") || value.eq_ignore_ascii_case("false") {
                    return false;
                }
                match parse_date(value) {
                    Some(date) => date <= self.now,
                    None => true,
                }
            }
            _ => true,
        }
    }

    /// Comma-split tags, deduplicated by normalized reference.
    pub fn tags(&self, raw: &str) -> Vec<TagRef> {
        let mut tags: Vec<TagRef> = Vec::new();
        for tag in raw.split(',').map(str::trim) {
            let reference = normalize_ref(tag);
            if reference.is_empty() || tags.iter().any(|t| t.reference == reference) {
                continue;
            }
            let slug = self
                .config
                .tag_pages
                .as_ref()
                .map(|tp| format!("{}/{}/{}", tp.root, reference, self.config.index_filename));
            let link = slug.as_ref().map(|slug| {
                paths::slug_to_link(slug, &self.config.root, &self.config.index_filename)
            });
            tags.push(TagRef {
                tag: tag.to_string(),
                reference,
                link,
                slug,
            });
        }
        tags
    }
}

/// Title from the last meaningful slug segment: "post/my-trip/index.html" -> "My Trip".
fn default_title(slug: &str, index_filename: &str) -> String {
    let path = slug.strip_suffix(index_filename).unwrap_or(slug);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let stem = segment.split('.').next().unwrap_or(segment);
    title_case(stem)
}
