//! Expression-aware markdown rendering.
//!
//! `${…}`/`!{…}` spans are cut out before the markdown parser sees the
//! text and spliced back into the rendered HTML afterwards. Spans that
//! land inside code are shown as highlighted code instead of evaluated.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

use super::highlight::SyntaxHighlighter;
use super::scan;
use crate::config::MarkdownConfig;
use crate::log;
use crate::util::html_escape;

/// Base placeholder joined between literal segments. Alphanumeric so the
/// markdown grammar passes it through untouched.
const PLACEHOLDER: &str = "xPkEXPRq7Zx";

/// Language used to highlight expression text shown inside code.
const EXPRESSION_LANGUAGE: &str = "javascript";

static NAV_HEADING_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<p>\s*(<nav-heading>.*?</nav-heading>)\s*</p>").unwrap()
});

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// Parser options for the configured extensions.
pub fn markdown_options(markdown_config: &MarkdownConfig) -> Result<Options, MarkdownError> {
    let mut options = Options::empty();
    for extension in &markdown_config.extensions {
        match extension.as_str() {
            "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "gfm" => options.insert(Options::ENABLE_GFM),
            "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tables" => options.insert(Options::ENABLE_TABLES),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            other => return Err(MarkdownError::InvalidExtension(other.to_string())),
        }
    }
    Ok(options)
}

/// Convert markdown containing expression spans to HTML.
pub fn to_html(
    markdown: &str,
    highlighter: &SyntaxHighlighter,
    markdown_config: &MarkdownConfig,
) -> Result<String, MarkdownError> {
    let options = markdown_options(markdown_config)?;
    let scan = scan::scan(markdown);

    if scan.expressions.is_empty() {
        let html = render_markdown(markdown, highlighter, options);
        return Ok(unwrap_nav_heading(&html));
    }

    let placeholder = unique_placeholder(markdown);
    let joined = scan.segments.join(&placeholder);
    let html = render_markdown(&joined, highlighter, options);

    let parts: Vec<&str> = html.split(placeholder.as_str()).collect();
    if parts.len() != scan.expressions.len() + 1 {
        log!("warn"; "markdown moved {} of {} expression(s); output may be incomplete",
            parts.len().saturating_sub(1), scan.expressions.len());
    }

    let mut out = String::with_capacity(html.len() + markdown.len());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let Some(expression) = scan.expressions.get(i - 1) else {
                continue;
            };
            if let Some(live) = scan::undouble(expression) {
                out.push_str(&live);
            } else if inside_code(&out) {
                let shown = highlighter.highlight_fragment(expression, EXPRESSION_LANGUAGE);
                out.push_str(&escape_code_markers(&shown));
            } else {
                out.push_str(expression);
            }
        }
        out.push_str(part);
    }

    Ok(unwrap_nav_heading(&out))
}

/// Render markdown with pulldown-cmark, highlighting fenced code and
/// neutralizing template markers inside every code region.
fn render_markdown(markdown: &str, highlighter: &SyntaxHighlighter, options: Options) -> String {
    let parser = Parser::new_ext(markdown, options);

    // Process events, intercepting code blocks for syntax highlighting
    let mut in_code_block = false;
    let mut code_language = String::new();
    let mut code_content = String::new();

    let events: Vec<Event> = parser
        .flat_map(|event| match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_content.clear();
                vec![] // Don't emit the start tag yet
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let highlighted = highlighter.highlight(&code_content, &code_language);
                vec![Event::Html(escape_code_markers(&highlighted).into())]
            }
            Event::Text(text) if in_code_block => {
                code_content.push_str(&text);
                vec![]
            }
            Event::Code(text) => {
                let escaped = escape_code_markers(&html_escape(&text));
                vec![Event::Html(format!("<code>{escaped}</code>").into())]
            }
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    html_output
}

/// A placeholder that does not already occur in `text`.
fn unique_placeholder(text: &str) -> String {
    let mut placeholder = PLACEHOLDER.to_string();
    let mut n = 0;
    while text.contains(&placeholder) {
        n += 1;
        placeholder = format!("{PLACEHOLDER}{n}x");
    }
    placeholder
}

/// Whether the end of `html` sits inside an open `<code>` element.
fn inside_code(html: &str) -> bool {
    let open = html.rmatch_indices("<code").map(|(i, _)| i).find(|&i| {
        html[i + "<code".len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_ascii_whitespace())
    });
    match (open, html.rfind("</code>")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Entity-escape characters a later template pass would interpret.
pub fn escape_code_markers(code: &str) -> String {
    code.replace('`', "&#96;")
        .replace('\\', "&#92;")
        .replace(scan::IMMEDIATE, "&#36;{")
        .replace(scan::DEFERRED, "&#33;{")
}

/// Drop the paragraph markdown wraps around an inline `<nav-heading>`.
fn unwrap_nav_heading(html: &str) -> String {
    NAV_HEADING_PARAGRAPH_RE.replace_all(html, "$1").into_owned()
}
