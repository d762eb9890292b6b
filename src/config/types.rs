//! Configuration type definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Site configuration
// =============================================================================

/// Root configuration, loaded from `presskit.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Content root (markdown, HTML and other files that become records)
    pub content_dir: PathBuf,
    /// Template root (also the base for `include()` paths)
    pub template_dir: PathBuf,
    /// Build root; every record slug is written beneath it
    pub build_dir: PathBuf,
    /// URL prefix prepended to every link
    pub root: String,
    /// Index filename used for directory-style slugs
    pub index_filename: String,
    /// Template applied to page-like records without a `template` key
    pub default_template: String,
    /// Line that opens and closes the front matter block
    pub front_matter_delimiter: String,
    /// Publish drafts and future-dated records
    pub development: bool,
    /// Ordered slug rewrites, applied after derivation
    pub slug_replace: Vec<SlugReplace>,
    pub markdown: MarkdownConfig,
    pub headings: HeadingConfig,
    pub dir_pages: ListingConfig,
    /// Tag listing pages; `null` disables tag links and tag pages
    pub tag_pages: Option<TagPagesConfig>,
    pub minify: MinifyConfig,
    /// Static directories copied verbatim into the build root
    pub pass_through: Vec<PassThrough>,
    pub watch: WatchConfig,
    /// Arbitrary values exposed to expressions as `tacs.config`
    pub globals: serde_json::Value,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("src/content"),
            template_dir: PathBuf::from("src/template"),
            build_dir: PathBuf::from("build"),
            root: "/".to_string(),
            index_filename: "index.html".to_string(),
            default_template: "default.html".to_string(),
            front_matter_delimiter: "---".to_string(),
            development: false,
            slug_replace: Vec::new(),
            markdown: MarkdownConfig::default(),
            headings: HeadingConfig::default(),
            dir_pages: ListingConfig::default(),
            tag_pages: Some(TagPagesConfig::default()),
            minify: MinifyConfig::default(),
            pass_through: Vec::new(),
            watch: WatchConfig::default(),
            globals: serde_json::Value::Object(Default::default()),
        }
    }
}

/// A single slug rewrite: every match of `pattern` becomes `replace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugReplace {
    pub pattern: String,
    #[serde(default)]
    pub replace: String,
}

// =============================================================================
// Markdown and headings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "definition_lists".to_string(),
        "footnotes".to_string(),
        "gfm".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}

/// Heading anchor and contents-list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Lowest heading level processed (1 or 2)
    pub min_level: u8,
    /// Highest heading level processed
    pub max_level: u8,
    /// Append a `#` permalink to each heading
    pub anchor_link: bool,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            min_level: 2,
            max_level: 6,
            anchor_link: true,
        }
    }
}

// =============================================================================
// Listings
// =============================================================================

/// Sort direction for listings and navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A sort rule: primary field plus direction. Date descending breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Directory listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Records per listing page (0 disables listing pages)
    pub size: usize,
    pub template: String,
    pub sort_by: String,
    pub sort_order: SortOrder,
    /// Per top-level directory sort overrides (also applied to its nav subtree)
    pub overrides: HashMap<String, SortRule>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            size: 24,
            template: "list.html".to_string(),
            sort_by: "priority".to_string(),
            sort_order: SortOrder::Desc,
            overrides: HashMap::new(),
        }
    }
}

impl ListingConfig {
    /// The sort rule for a directory, honoring overrides.
    pub fn rule_for(&self, directory: &str) -> SortRule {
        self.overrides.get(directory).cloned().unwrap_or(SortRule {
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order,
        })
    }
}

/// Tag listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPagesConfig {
    /// Directory the tag pages live under (e.g. "tag" -> /tag/rust/)
    pub root: String,
    pub size: usize,
    pub template: String,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for TagPagesConfig {
    fn default() -> Self {
        Self {
            root: "tag".to_string(),
            size: 24,
            template: "list.html".to_string(),
            sort_by: "date".to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl TagPagesConfig {
    pub fn rule(&self) -> SortRule {
        SortRule {
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifyConfig {
    /// Minify HTML outputs. XML outputs are always whitespace-minified.
    pub html: bool,
}

/// A directory copied as-is into the build root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassThrough {
    pub from: PathBuf,
    #[serde(default)]
    pub to: PathBuf,
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}
