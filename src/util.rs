//! Shared utility functions.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#?\w+;").unwrap());

/// Convert a slug to title case.
///
/// Splits on `-` and `_`, capitalizes each word.
/// "getting-started" -> "Getting Started"
/// "api_reference" -> "Api Reference"
pub fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Remove all markup tags, leaving the text content.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Remove markup tags and HTML entities.
pub fn plain_text(html: &str) -> String {
    let text = strip_tags(html);
    ENTITY_RE.replace_all(&text, " ").into_owned()
}

/// Normalize free text into a lowercase, dash-joined reference.
/// "Web Dev & Rust!" -> "web-dev-rust"
pub fn normalize_ref(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut dash = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if dash && !out.is_empty() {
                out.push('-');
            }
            dash = false;
            out.push(c);
        } else {
            dash = true;
        }
    }
    out
}

/// Count alphanumeric words in an HTML fragment.
pub fn word_count(html: &str) -> usize {
    plain_text(html)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .count()
}

/// Parse a front matter style date: RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("getting-started"), "Getting Started");
        assert_eq!(title_case("installation"), "Installation");
        assert_eq!(title_case("api_reference"), "Api Reference");
        assert_eq!(title_case("README"), "README");
        assert_eq!(title_case("my-cool-feature"), "My Cool Feature");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<div>&</div>"), "&lt;div&gt;&amp;&lt;/div&gt;");
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("Web Dev & Rust!"), "web-dev-rust");
        assert_eq!(normalize_ref("  JavaScript "), "javascript");
        assert_eq!(normalize_ref("C++"), "c");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("<p>Hello <b>big</b> world.</p>"), 3);
        assert_eq!(word_count("<p>one&amp;two</p>"), 2);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_parse_date() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(d.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 00:00");
        let d = parse_date("2024-03-01T10:30:00Z").unwrap();
        assert_eq!(d.format("%H:%M").to_string(), "10:30");
        assert!(parse_date("2024-03-01 08:15").is_some());
        assert!(parse_date("next week").is_none());
    }
}
