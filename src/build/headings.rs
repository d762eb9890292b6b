//! Heading anchors and the nested contents list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::HeadingConfig;
use crate::util::{html_escape, strip_tags};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h([1-6])(\s[^>]*)?>(.*?)</h[1-6]>").unwrap());
static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)id\s*=\s*["']([^"']*)["']"#).unwrap());
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s(noid|nolink|nomenu)(?:=(?:""|''))?(?:\s|$)"#).unwrap());
static NAV_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nav-heading>.*?</nav-heading>").unwrap());
static EMPTY_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<li></li>|<ol></ol>").unwrap());

/// Headings with ids and the contents list built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingOutput {
    pub content: String,
    pub nav_heading: String,
}

/// Per-heading opt-outs, written as bare attributes: `<h2 nomenu>`.
#[derive(Debug, Default, Clone, Copy)]
struct Markers {
    noid: bool,
    nolink: bool,
    nomenu: bool,
}

/// Give each heading in range an id and permalink, and build the contents list.
pub fn add_heading_anchors(html: &str, config: &HeadingConfig) -> HeadingOutput {
    let levels = config.min_level..=config.max_level;
    let mut used: HashSet<String> = HashSet::new();
    let mut contents = ContentsBuilder::new(config.min_level.saturating_sub(1));

    let content = HEADING_RE.replace_all(html, |caps: &Captures| {
        let level: u8 = caps[1].parse().unwrap_or(0);
        if !levels.contains(&level) {
            return caps[0].to_string();
        }

        let attrs = caps.get(2).map_or("", |m| m.as_str());
        let inner = &caps[3];
        let (attrs, markers) = take_markers(attrs);
        let existing = ID_ATTR_RE.captures(&attrs).map(|c| c[1].to_string());

        let id = match existing {
            Some(id) => {
                used.insert(id.clone());
                Some(id)
            }
            None if markers.noid => None,
            None => Some(unique_id(&heading_id(inner), &mut used)),
        };

        if !markers.nomenu {
            contents.push(level, id.as_deref(), strip_tags(inner).trim());
        }

        let id_attr = match (&id, ID_ATTR_RE.is_match(&attrs)) {
            (Some(id), false) => format!(" id=\"{id}\""),
            _ => String::new(),
        };
        let anchor = match &id {
            Some(id) if config.anchor_link && !markers.nolink => format!(
                " <a class=\"header-anchor\" href=\"#{id}\" aria-label=\"Link to this heading\">#</a>"
            ),
            _ => String::new(),
        };

        format!("<h{level}{id_attr}{attrs}>{inner}{anchor}</h{level}>")
    });

    HeadingOutput {
        content: content.into_owned(),
        nav_heading: contents.finish(),
    }
}

/// Put the contents list inside every `<nav-heading>` element.
pub fn splice_nav_heading(html: &str, nav_heading: &str) -> String {
    if !html.contains("<nav-heading>") {
        return html.to_string();
    }
    let replacement = format!("<nav-heading>{nav_heading}</nav-heading>");
    NAV_HEADING_RE
        .replace_all(html, regex::NoExpand(&replacement))
        .into_owned()
}

/// Derive an id from heading markup: plain text, lowercased, dash-joined.
pub fn heading_id(inner_html: &str) -> String {
    let text = crate::util::plain_text(inner_html).to_lowercase();
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect();
    let id = words.join("-");

    if id.chars().next().is_some_and(char::is_alphabetic) {
        id
    } else {
        format!("h{id}")
    }
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{base}-{n}");
        n += 1;
    }
    used.insert(id.clone());
    id
}

/// Strip marker attributes, reporting which were present.
fn take_markers(attrs: &str) -> (String, Markers) {
    let mut markers = Markers::default();
    let mut rest = attrs.to_string();
    // Adjacent markers share whitespace, so strip until none remain
    while let Some((name, range)) = MARKER_RE
        .captures(&rest)
        .and_then(|caps| Some((caps.get(1)?.as_str().to_string(), caps.get(0)?.range())))
    {
        match name.as_str() {
            "noid" => markers.noid = true,
            "nolink" => markers.nolink = true,
            _ => markers.nomenu = true,
        }
        rest.replace_range(range, " ");
    }
    let trimmed = rest.trim_end();
    let rest = if trimmed.trim().is_empty() {
        String::new()
    } else {
        trimmed.to_string()
    };
    (rest, markers)
}

/// Builds nested `<ol>` markup from headings in document order.
struct ContentsBuilder {
    base: u8,
    current: u8,
    html: String,
}

impl ContentsBuilder {
    fn new(base: u8) -> Self {
        Self {
            base,
            current: base,
            html: String::new(),
        }
    }

    fn push(&mut self, level: u8, id: Option<&str>, text: &str) {
        if level > self.current {
            for _ in self.current..level {
                self.html.push_str("<ol><li>");
            }
        } else {
            for _ in level..self.current {
                self.html.push_str("</li></ol>");
            }
            self.html.push_str("</li><li>");
        }
        self.current = level;

        let text = html_escape(text);
        match id {
            Some(id) => self.html.push_str(&format!("<a href=\"#{id}\">{text}</a>")),
            None => self.html.push_str(&text),
        }
    }

    fn finish(mut self) -> String {
        for _ in self.base..self.current {
            self.html.push_str("</li></ol>");
        }
        let mut html = self.html;
        while EMPTY_LIST_RE.is_match(&html) {
            html = EMPTY_LIST_RE.replace_all(&html, "").into_owned();
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(html: &str) -> HeadingOutput {
        add_heading_anchors(html, &HeadingConfig::default())
    }

    #[test]
    fn test_nested_contents() {
        let out = anchors("<h2>A</h2>\n<h3>B</h3>\n<h2>C</h2>");
        assert_eq!(
            out.nav_heading,
            "<ol><li><a href=\"#a\">A</a><ol><li><a href=\"#b\">B</a></li></ol></li><li><a href=\"#c\">C</a></li></ol>"
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let out = anchors("<h2>A</h2><h2>A</h2><h2>A</h2>");
        assert!(out.content.contains("<h2 id=\"a\">"));
        assert!(out.content.contains("<h2 id=\"a-2\">"));
        assert!(out.content.contains("<h2 id=\"a-3\">"));
    }

    #[test]
    fn test_anchor_link() {
        let out = anchors("<h2>Getting Started</h2>");
        assert_eq!(
            out.content,
            "<h2 id=\"getting-started\">Getting Started <a class=\"header-anchor\" href=\"#getting-started\" aria-label=\"Link to this heading\">#</a></h2>"
        );
    }

    #[test]
    fn test_existing_id_reused() {
        let out = anchors("<h2 id=\"custom\">Title</h2><h2>Custom</h2>");
        assert!(out.content.starts_with("<h2 id=\"custom\">Title"));
        assert!(out.content.contains("<h2 id=\"custom-2\">Custom"));
        assert!(out.nav_heading.contains("href=\"#custom\""));
    }

    #[test]
    fn test_markers() {
        let out = anchors("<h2 nomenu>Hidden</h2><h2 nolink>Plain</h2><h2 noid>No Id</h2>");
        assert!(out.content.contains("<h2 id=\"hidden\">Hidden <a"));
        assert!(out.content.contains("<h2 id=\"plain\">Plain</h2>"));
        assert!(out.content.contains("<h2>No Id</h2>"));
        assert!(!out.nav_heading.contains("Hidden"));
        assert!(out.nav_heading.contains("<a href=\"#plain\">Plain</a>"));
        assert!(out.nav_heading.contains("<li>No Id</li>"));
    }

    #[test]
    fn test_out_of_range_untouched() {
        let out = anchors("<h1>Page</h1><h2>Section</h2>");
        assert!(out.content.starts_with("<h1>Page</h1>"));
        assert!(!out.nav_heading.contains("Page"));
    }

    #[test]
    fn test_heading_id() {
        assert_eq!(heading_id("What's <em>New</em>?"), "whats-new");
        assert_eq!(heading_id("2024 Plans"), "h2024-plans");
        assert_eq!(heading_id("API  Reference"), "api-reference");
        assert_eq!(heading_id("!!!"), "h");
    }

    #[test]
    fn test_no_headings() {
        let out = anchors("<p>text</p>");
        assert_eq!(out.content, "<p>text</p>");
        assert_eq!(out.nav_heading, "");
    }

    #[test]
    fn test_splice_nav_heading() {
        let html = "<nav-heading></nav-heading><p>x</p><nav-heading>old</nav-heading>";
        assert_eq!(
            splice_nav_heading(html, "<ol></ol>"),
            "<nav-heading><ol></ol></nav-heading><p>x</p><nav-heading><ol></ol></nav-heading>"
        );
    }
}
