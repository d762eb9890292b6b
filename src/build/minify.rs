//! Output minification for HTML and XML records.

use crate::config::MinifyConfig;

/// Which minifier an output gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyType {
    Html,
    Xml,
}

/// Minify `content` when its type calls for it.
///
/// HTML is minified only when enabled in the config; XML always gets the
/// whitespace minifier.
pub fn minify(content: String, kind: MinifyType, config: &MinifyConfig) -> String {
    match kind {
        MinifyType::Html if config.html => minify_html_inner(&content),
        MinifyType::Html => content,
        MinifyType::Xml => minify_xml_inner(&content),
    }
}

/// Minify HTML content using `minify_html` crate.
fn minify_html_inner(html: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    // Scripts may carry request-time `${…}` expressions
    cfg.minify_js = false;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    String::from_utf8_lossy(&minify_html::minify(html.as_bytes(), &cfg)).into_owned()
}

/// Minify XML by removing unnecessary whitespace.
fn minify_xml_inner(xml: &str) -> String {
    xml.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(html: bool) -> MinifyConfig {
        MinifyConfig { html }
    }

    #[test]
    fn test_minify_html_enabled() {
        let html = "<html>\n  <body>\n    <p>Hello World</p>\n  </body>\n</html>".to_string();
        let minified = minify(html.clone(), MinifyType::Html, &enabled(true));
        assert!(minified.len() < html.len());
        assert!(minified.contains("<p>Hello World</p>"));
    }

    #[test]
    fn test_minify_html_disabled() {
        let html = "<html>\n  <body>\n  </body>\n</html>".to_string();
        assert_eq!(minify(html.clone(), MinifyType::Html, &enabled(false)), html);
    }

    #[test]
    fn test_minify_xml_always() {
        let xml = "<?xml version=\"1.0\"?>\n<rss>\n  <item>Hello</item>\n\n</rss>\n".to_string();
        assert_eq!(
            minify(xml, MinifyType::Xml, &enabled(false)),
            "<?xml version=\"1.0\"?><rss><item>Hello</item></rss>"
        );
    }
}
