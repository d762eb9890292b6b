use std::sync::LazyLock;

use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language, themes};
use regex::Regex;

use crate::util::html_escape;

/// Block wrappers autumnus puts around each highlighted line.
static LINE_WRAPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?div[^>]*>").unwrap());

/// A syntax highlighter using autumnus (tree-sitter based).
pub struct SyntaxHighlighter {
    theme_name: String,
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the given theme.
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme_name: theme_name.to_string(),
        }
    }

    /// Highlight code and return HTML with CSS classes.
    /// Returns the original code wrapped in a plain `<code>` if the language is not supported.
    pub fn highlight(&self, code: &str, language: &str) -> String {
        self.format(code, language)
            .unwrap_or_else(|| Self::plain_code_block(code, language))
    }

    /// Highlight a fragment that sits inside an existing `<code>` element.
    ///
    /// Returns only the highlighted spans, without the `<pre><code>` block.
    pub fn highlight_fragment(&self, code: &str, language: &str) -> String {
        let Some(block) = self.format(code, language) else {
            return html_escape(code);
        };

        let inner = block
            .find("<code")
            .and_then(|start| block[start..].find('>').map(|end| start + end + 1))
            .zip(block.rfind("</code>"))
            .filter(|(start, end)| start <= end)
            .map(|(start, end)| &block[start..end]);

        match inner {
            Some(inner) => LINE_WRAPPER_RE
                .replace_all(inner, "")
                .trim_end_matches('\n')
                .to_string(),
            None => html_escape(code),
        }
    }

    /// Generate CSS for the current theme.
    pub fn generate_css(&self) -> Option<String> {
        let theme = themes::get(&self.theme_name).ok()?;
        Some(theme.css(false)) // false = don't enable italic
    }

    fn format(&self, code: &str, language: &str) -> Option<String> {
        // Use Language::guess which handles language detection from name or extension
        let lang = Language::guess(language, code);

        // Unrecognized languages get a plain block
        if matches!(lang, Language::PlainText)
            && !language.is_empty()
            && language != "plaintext"
            && language != "text"
        {
            return None;
        }

        let formatter = HtmlLinkedBuilder::new().source(code).lang(lang).build().ok()?;
        let mut output: Vec<u8> = Vec::new();
        formatter.format(&mut output).ok()?;
        String::from_utf8(output).ok()
    }

    /// Create a plain code block without highlighting.
    fn plain_code_block(code: &str, language: &str) -> String {
        let escaped = html_escape(code);
        if language.is_empty() {
            format!("<pre><code>{}</code></pre>", escaped)
        } else {
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                language, escaped
            )
        }
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new("github-dark")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {}";
        let result = highlighter.highlight(code, "rust");
        // Should contain highlighted spans
        assert!(result.contains("<pre"));
        assert!(result.contains("</pre>"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let result = highlighter.highlight("some <code>", "unknown_lang_xyz");
        // Should fall back to plain code block
        assert!(result.contains("<pre><code class=\"language-unknown_lang_xyz\">"));
        assert!(result.contains("some &lt;code&gt;"));
    }

    #[test]
    fn test_highlight_fragment_has_no_block() {
        let highlighter = SyntaxHighlighter::default();
        let result = highlighter.highlight_fragment("${ data.title }", "javascript");
        assert!(!result.contains("<pre"));
        assert!(!result.contains("<code"));
        assert!(!result.contains("<div"));
        assert!(result.contains("title"));
    }

    #[test]
    fn test_highlight_fragment_unknown_language_escapes() {
        let highlighter = SyntaxHighlighter::default();
        assert_eq!(
            highlighter.highlight_fragment("a < b", "unknown_lang_xyz"),
            "a &lt; b"
        );
    }

    #[test]
    fn test_generate_css() {
        let highlighter = SyntaxHighlighter::new("dracula");
        let css = highlighter.generate_css();
        assert!(css.is_some());
        // CSS should contain style definitions
        let css_str = css.unwrap();
        assert!(!css_str.is_empty());
    }
}
