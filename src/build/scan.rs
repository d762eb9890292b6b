//! Expression boundary scanning.
//!
//! Finds `${…}` (immediate) and `!{…}` (deferred) spans inside free text.
//! Braces are balanced, and quoted literals (single, double and back-tick)
//! suppress brace interpretation, honoring backslash escapes.

/// Opens an expression evaluated at build time.
pub const IMMEDIATE: &str = "${";
/// Opens an expression left for a later render stage.
pub const DEFERRED: &str = "!{";

/// Text split into literal segments and expression spans.
///
/// `segments.len() == expressions.len() + 1`, and interleaving
/// `segments[0], expressions[0], segments[1], …` reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<'a> {
    pub segments: Vec<&'a str>,
    pub expressions: Vec<&'a str>,
}

impl Scan<'_> {
    /// Reassemble the original text.
    pub fn join(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            out.push_str(segment);
            if let Some(expr) = self.expressions.get(i) {
                out.push_str(expr);
            }
        }
        out
    }
}

/// Split `text` into literal segments and expression spans.
///
/// An unterminated span ends the scan; everything from its marker on
/// becomes the trailing segment.
pub fn scan(text: &str) -> Scan<'_> {
    let mut segments = Vec::new();
    let mut expressions = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find_marker(text, cursor) {
        let Some(end) = find_close(text, start + 2) else {
            break;
        };
        segments.push(&text[cursor..start]);
        expressions.push(&text[start..=end]);
        cursor = end + 1;
    }

    segments.push(&text[cursor..]);
    Scan {
        segments,
        expressions,
    }
}

/// Byte offset of the next `${` or `!{` at or after `from`.
pub fn find_marker(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i + 1 < bytes.len() {
        if (bytes[i] == b'$' || bytes[i] == b'!') && bytes[i + 1] == b'{' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Find the `}` that closes a span whose body starts at `body_start`
/// (the byte just after the opening `{`). Depth starts at one.
pub fn find_close(text: &str, body_start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = body_start;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Whether an expression span is deferred (`!{…}`).
pub fn is_deferred(expression: &str) -> bool {
    expression.starts_with(DEFERRED)
}

/// The body of an expression span, without marker and closing brace.
pub fn body(expression: &str) -> &str {
    &expression[2..expression.len() - 1]
}

/// Collapse the doubled-brace escape form: `${{ x }}` -> `${ x }`.
/// Returns `None` for ordinary spans.
pub fn undouble(expression: &str) -> Option<String> {
    let inner = body(expression);
    if inner.len() >= 2 && inner.starts_with('{') && inner.ends_with('}') {
        Some(format!("{}{}}}", &expression[..2], &inner[1..inner.len() - 1]))
    } else {
        None
    }
}

/// Rewrite every deferred span to the immediate marker, leaving its body untouched.
pub fn rewrite_deferred(text: &str) -> String {
    let scan = scan(text);
    if scan.expressions.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for (i, segment) in scan.segments.iter().enumerate() {
        out.push_str(segment);
        if let Some(expr) = scan.expressions.get(i) {
            if is_deferred(expr) {
                out.push_str(IMMEDIATE);
                out.push_str(&expr[2..]);
            } else {
                out.push_str(expr);
            }
        }
    }
    out
}
