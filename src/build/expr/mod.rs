//! Sandboxed expression language used inside `${…}` spans.
//!
//! Expressions are evaluated against an explicit, read-only context: the
//! current record (`data`), the site aggregate (`tacs`), arrow-function
//! parameters, and a fixed helper registry. There is no assignment and no
//! access to anything outside the context.

mod eval;
mod lexer;
mod parser;
mod value;

use std::rc::Rc;

use serde_json::Value as Json;

pub use value::Value;

#[derive(thiserror::Error, Debug)]
pub enum ExprError {
    #[error("syntax error in `{expression}`: {message}")]
    Syntax { message: String, expression: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown method '{method}' on {target}")]
    UnknownMethod {
        method: String,
        target: &'static str,
    },

    #[error("cannot include '{path}': {source}")]
    Include {
        path: String,
        source: std::io::Error,
    },
}

impl ExprError {
    pub fn syntax(message: impl Into<String>, expression: &str) -> Self {
        ExprError::Syntax {
            message: message.into(),
            expression: expression.trim().to_string(),
        }
    }
}

/// Services the evaluator needs from the renderer driving it.
pub trait Host {
    /// Fetch `path` from the template root and expand it against `env`.
    fn include(&self, path: &str, env: Env<'_>) -> Result<String, ExprError>;

    /// Final rendered body of the record with this slug, if already rendered.
    fn rendered(&self, slug: &str) -> Option<String>;
}

/// The evaluation context for one expression.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub data: &'a Json,
    pub tacs: &'a Json,
    pub host: &'a dyn Host,
}

/// Parse and evaluate an expression body, returning its substitution text.
pub fn evaluate(body: &str, env: Env<'_>) -> Result<String, ExprError> {
    let expr = parser::parse(body)?;
    let scope = Rc::new(value::Scope::default());
    let value = eval::Evaluator::new(env).eval(&expr, &scope)?;
    Ok(value.substitution())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    struct TestHost {
        files: HashMap<&'static str, &'static str>,
        rendered: HashMap<String, String>,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                files: HashMap::from([("partial.html", "<b>${ data.title }</b>")]),
                rendered: HashMap::from([("post/a/index.html".to_string(), "<p>A!</p>".to_string())]),
            }
        }
    }

    impl Host for TestHost {
        fn include(&self, path: &str, env: Env<'_>) -> Result<String, ExprError> {
            let text = self.files.get(path).ok_or_else(|| ExprError::Include {
                path: path.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            let scan = crate::build::scan::scan(text);
            let mut out = String::new();
            for (i, segment) in scan.segments.iter().enumerate() {
                out.push_str(segment);
                if let Some(expr) = scan.expressions.get(i) {
                    out.push_str(&evaluate(crate::build::scan::body(expr), env)?);
                }
            }
            Ok(out)
        }

        fn rendered(&self, slug: &str) -> Option<String> {
            self.rendered.get(slug).cloned()
        }
    }

    fn context() -> (Json, Json) {
        let data = json!({
            "title": "Hello",
            "count": 3,
            "draft": false,
            "date": "2024-05-06T10:00:00",
            "tags": [{ "tag": "Rust", "ref": "rust" }, { "tag": "Web", "ref": "web" }],
        });
        let tacs = json!({
            "dir": {
                "post": [
                    { "slug": "post/a/index.html", "title": "A", "priority": 0.5 },
                    { "slug": "post/b/index.html", "title": "B", "priority": 0.1 },
                ]
            },
            "config": { "site": "Example" },
        });
        (data, tacs)
    }

    fn eval(src: &str) -> Result<String, ExprError> {
        let (data, tacs) = context();
        let host = TestHost::new();
        let env = Env {
            data: &data,
            tacs: &tacs,
            host: &host,
        };
        evaluate(src, env)
    }

    #[test]
    fn test_member_access() {
        assert_eq!(eval("data.title").unwrap(), "Hello");
        assert_eq!(eval("tacs.config.site").unwrap(), "Example");
        assert_eq!(eval("data.missing").unwrap(), "");
        assert_eq!(eval("data.missing?.deeper").unwrap(), "");
        assert_eq!(eval("data.tags[1].tag").unwrap(), "Web");
        assert_eq!(eval("data['title']").unwrap(), "Hello");
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(eval("'abc'[1]").unwrap(), "b");
        assert_eq!(eval("'abc'[-1] ?? 'none'").unwrap(), "none");
        assert_eq!(eval("'abc'[0.5] ?? 'none'").unwrap(), "none");
        assert_eq!(eval("data.tags[-1] ?? 'none'").unwrap(), "none");
        assert_eq!(eval("data.tags[1.5] ?? 'none'").unwrap(), "none");
    }

    #[test]
    fn test_arithmetic_and_concat() {
        assert_eq!(eval("data.count * 2 + 1").unwrap(), "7");
        assert_eq!(eval("'n=' + data.count").unwrap(), "n=3");
        assert_eq!(eval("7 % 4").unwrap(), "3");
        assert_eq!(eval("1 / 4").unwrap(), "0.25");
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval("data.draft ? 'draft' : 'live'").unwrap(), "live");
        assert_eq!(eval("data.missing ?? 'fallback'").unwrap(), "fallback");
        assert_eq!(eval("data.title || 'x'").unwrap(), "Hello");
        assert_eq!(eval("data.count === 3 && data.count == '3'").unwrap(), "true");
        assert_eq!(eval("!data.draft").unwrap(), "true");
    }

    #[test]
    fn test_collection_methods() {
        assert_eq!(
            eval("tacs.dir.get('post').map(p => `<li>${ p.title }</li>`)").unwrap(),
            "<li>A</li><li>B</li>"
        );
        assert_eq!(
            eval("tacs.dir.post.filter(p => p.priority > 0.2).length").unwrap(),
            "1"
        );
        assert_eq!(eval("data.tags.map(t => t.ref).join(', ')").unwrap(), "rust, web");
        assert_eq!(eval("tacs.dir.post.find(p => p.title == 'B').slug").unwrap(), "post/b/index.html");
        assert_eq!(eval("[1, 2, 3].slice(-2).reverse()").unwrap(), "32");
        assert_eq!(eval("tacs.dir.has('post')").unwrap(), "true");
        assert_eq!(eval("tacs.dir.keys()").unwrap(), "post");
        assert_eq!(eval("tacs.dir.size").unwrap(), "1");
        assert_eq!(eval("[1, 2].map((n, i) => n + i)").unwrap(), "13");
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval("data.title.toUpperCase()").unwrap(), "HELLO");
        assert_eq!(eval("'a-b-c'.split('-').join('+')").unwrap(), "a+b+c");
        assert_eq!(eval("' x '.trim().length").unwrap(), "1");
        assert_eq!(eval("'aXbX'.replace('X', '.')").unwrap(), "a.bX");
        assert_eq!(eval("'aXbX'.replaceAll('X', '.')").unwrap(), "a.b.");
        assert_eq!(eval("data.title.slice(1, 3)").unwrap(), "el");
        assert_eq!(eval("(2.5).toFixed(2)").unwrap(), "2.50");
        assert_eq!(eval("(1).toFixed(1000).length").unwrap(), "102");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(eval("escapeHtml('<a href=\"x\">')").unwrap(), "&lt;a href=&quot;x&quot;&gt;");
        assert_eq!(eval("json(data.tags[0])").unwrap(), r#"{"ref":"rust","tag":"Rust"}"#);
        assert_eq!(eval("formatDate(data.date, '%d/%m/%Y')").unwrap(), "06/05/2024");
        assert_eq!(eval("upper(data.title)").unwrap(), "HELLO");
        assert_eq!(eval("include('partial.html')").unwrap(), "<b>Hello</b>");
    }

    #[test]
    fn test_content_rendered_lookup() {
        assert_eq!(eval("tacs.dir.post[0].contentRendered").unwrap(), "<p>A!</p>");
        assert_eq!(eval("tacs.dir.post[1].contentRendered").unwrap(), "");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("data.title +"), Err(ExprError::Syntax { .. })));
        assert!(matches!(eval("process('x')"), Err(ExprError::UnknownFunction(_))));
        assert!(matches!(
            eval("data.title.explode()"),
            Err(ExprError::UnknownMethod { target: "string", .. })
        ));
        assert!(matches!(eval("include('nope.html')"), Err(ExprError::Include { .. })));
    }
}
