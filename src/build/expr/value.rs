//! Runtime values for the expression evaluator.

use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as Json;

use super::parser::Expr;

/// A value produced while evaluating an expression.
///
/// Record and aggregate data is borrowed straight out of the JSON context
/// (`Json` only ever holds objects and arrays; JSON primitives are
/// normalized into the scalar variants).
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Array(Vec<Value<'a>>),
    Json(&'a Json),
    Lambda(Rc<Lambda<'a>>),
}

/// An arrow function with the scope it was created in.
#[derive(Debug)]
pub struct Lambda<'a> {
    pub params: Vec<String>,
    pub body: Rc<Expr>,
    pub scope: Rc<Scope<'a>>,
}

/// Variable bindings introduced by arrow function parameters.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    vars: HashMap<String, Value<'a>>,
    parent: Option<Rc<Scope<'a>>>,
}

impl<'a> Scope<'a> {
    pub fn child(parent: &Rc<Scope<'a>>, vars: HashMap<String, Value<'a>>) -> Rc<Self> {
        Rc::new(Scope {
            vars,
            parent: Some(parent.clone()),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Value<'a>> {
        self.vars
            .get(name)
            .or_else(|| self.parent.as_deref().and_then(|p| p.lookup(name)))
    }
}

impl<'a> Value<'a> {
    pub fn from_json(json: &'a Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(Cow::Borrowed(s)),
            Json::Array(_) | Json::Object(_) => Value::Json(json),
        }
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(Cow::Owned(s.into()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Json(Json::Array(_)) => "array",
            Value::Json(_) => "object",
            Value::Lambda(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Json(_) | Value::Lambda(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Elements of an array value, or `None` for non-arrays.
    pub fn items(&self) -> Option<Vec<Value<'a>>> {
        match self {
            Value::Array(items) => Some(items.clone()),
            Value::Json(Json::Array(items)) => Some(items.iter().map(Value::from_json).collect()),
            _ => None,
        }
    }

    /// String conversion used by `+`, template literals and `join`.
    /// Arrays are comma-joined, objects print as `[object Object]`.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Json(Json::Object(_)) => "[object Object]".to_string(),
            Value::Lambda(_) => "[function]".to_string(),
            array => array
                .items()
                .unwrap_or_default()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// String substituted for a top-level expression span.
    ///
    /// `null`/`undefined` become empty, collections concatenate their
    /// stringified elements (object values in key order) with no separator.
    pub fn substitution(&self) -> String {
        match self {
            Value::Undefined | Value::Null | Value::Lambda(_) => String::new(),
            Value::Array(items) => items.iter().map(Value::substitution).collect(),
            Value::Json(Json::Array(items)) => items
                .iter()
                .map(|j| Value::from_json(j).substitution())
                .collect(),
            Value::Json(Json::Object(map)) => map
                .values()
                .map(|j| Value::from_json(j).substitution())
                .collect(),
            other => other.to_display(),
        }
    }

    /// Convert back into JSON (for the `json` helper).
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null | Value::Lambda(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
                }
            }
            Value::Str(s) => Json::String(s.to_string()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Json(json) => (*json).clone(),
        }
    }

    /// Loose equality (`==`): `null == undefined`, numbers compare with numeric strings.
    pub fn loose_eq(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Strict equality (`===`). Objects and arrays compare by identity.
    pub fn strict_eq(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => std::ptr::eq(*a, *b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Print a number the way templates expect: integers without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_substitution() {
        let list = json!(["a", 1, null, ["b", true]]);
        assert_eq!(Value::from_json(&list).substitution(), "a1btrue");

        let obj = json!({ "x": "1", "y": 2 });
        assert_eq!(Value::from_json(&obj).substitution(), "12");

        assert_eq!(Value::Null.substitution(), "");
        assert_eq!(Value::Undefined.substitution(), "");
        assert_eq!(Value::Number(0.1).substitution(), "0.1");
    }

    #[test]
    fn test_display() {
        let list = json!(["a", null, 2]);
        assert_eq!(Value::from_json(&list).to_display(), "a,,2");
        assert_eq!(Value::from_json(&json!({})).to_display(), "[object Object]");
        assert_eq!(Value::Undefined.to_display(), "undefined");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::str("").truthy());
        assert!(Value::str("0").truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::from_json(&json!([])).truthy());
        assert!(!Value::Undefined.truthy());
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::Number(1.0).loose_eq(&Value::str("1")));
        assert!(!Value::Number(1.0).strict_eq(&Value::str("1")));
        assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));

        let obj = json!({ "a": 1 });
        assert!(Value::from_json(&obj).strict_eq(&Value::from_json(&obj)));
    }

    #[test]
    fn test_scope_lookup() {
        let root = Rc::new(Scope::default());
        let outer = Scope::child(&root, HashMap::from([("x".to_string(), Value::Number(1.0))]));
        let inner = Scope::child(&outer, HashMap::from([("y".to_string(), Value::Number(2.0))]));
        assert!(matches!(inner.lookup("x"), Some(Value::Number(n)) if *n == 1.0));
        assert!(matches!(inner.lookup("y"), Some(Value::Number(n)) if *n == 2.0));
        assert!(inner.lookup("z").is_none());
    }
}
