//! Tree-walking evaluator.

use std::collections::HashMap;
use std::rc::Rc;

use chrono::format::{Item, StrftimeItems};
use serde_json::Value as Json;

use super::parser::{BinaryOp, Expr, TemplatePart, UnaryOp};
use super::value::{Lambda, Scope, Value, format_number};
use super::{Env, ExprError};
use crate::util;

/// Key whose lookup on a record resolves through the rendered-content table.
const CONTENT_RENDERED: &str = "contentRendered";

pub struct Evaluator<'a> {
    env: Env<'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: Env<'a>) -> Self {
        Self { env }
    }

    pub fn eval(&self, expr: &Expr, scope: &Rc<Scope<'a>>) -> Result<Value<'a>, ExprError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => out.push_str(&self.eval(expr, scope)?.to_display()),
                    }
                }
                Ok(Value::str(out))
            }
            Expr::Ident(name) => Ok(self.lookup(name, scope)),
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
            Expr::Member {
                object, property, ..
            } => {
                let target = self.eval(object, scope)?;
                Ok(self.property(&target, property))
            }
            Expr::Index {
                object, index, ..
            } => {
                let target = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                Ok(self.index(&target, &index))
            }
            Expr::Call { callee, args } => self.call(callee, args, scope),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right, scope),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Arrow { params, body } => Ok(Value::Lambda(Rc::new(Lambda {
                params: params.clone(),
                body: body.clone(),
                scope: scope.clone(),
            }))),
        }
    }

    fn lookup(&self, name: &str, scope: &Scope<'a>) -> Value<'a> {
        if let Some(value) = scope.lookup(name) {
            return value.clone();
        }
        match name {
            "data" => Value::from_json(self.env.data),
            "tacs" => Value::from_json(self.env.tacs),
            _ => Value::Undefined,
        }
    }

    fn property(&self, target: &Value<'a>, property: &str) -> Value<'a> {
        match target {
            Value::Json(Json::Object(map)) => {
                if property == CONTENT_RENDERED
                    && let Some(Json::String(slug)) = map.get("slug")
                    && let Some(rendered) = self.env.host.rendered(slug)
                {
                    return Value::str(rendered);
                }
                match map.get(property) {
                    Some(json) => Value::from_json(json),
                    None if property == "size" => Value::Number(map.len() as f64),
                    None => Value::Undefined,
                }
            }
            Value::Str(s) if property == "length" => Value::Number(s.chars().count() as f64),
            other => match other.items() {
                Some(items) if property == "length" => Value::Number(items.len() as f64),
                _ => Value::Undefined,
            },
        }
    }

    fn index(&self, target: &Value<'a>, index: &Value<'a>) -> Value<'a> {
        if let Value::Number(n) = index {
            let position = (*n >= 0.0 && n.fract() == 0.0).then_some(*n as usize);
            if let Value::Str(s) = target {
                return position
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Undefined, |c| Value::str(c.to_string()));
            }
            if let Some(items) = target.items() {
                return position
                    .and_then(|i| items.into_iter().nth(i))
                    .unwrap_or(Value::Undefined);
            }
        }
        self.property(target, &index.to_display())
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        scope: &Rc<Scope<'a>>,
    ) -> Result<Value<'a>, ExprError> {
        let lhs = self.eval(left, scope)?;

        // Short-circuiting operators yield one of their operands
        match op {
            BinaryOp::And if !lhs.truthy() => return Ok(lhs),
            BinaryOp::Or if lhs.truthy() => return Ok(lhs),
            BinaryOp::Nullish if !lhs.is_nullish() => return Ok(lhs),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => return self.eval(right, scope),
            _ => {}
        }

        let rhs = self.eval(right, scope)?;
        Ok(match op {
            BinaryOp::Add => {
                if is_numeric(&lhs) && is_numeric(&rhs) {
                    Value::Number(lhs.to_number() + rhs.to_number())
                } else {
                    Value::str(lhs.to_display() + &rhs.to_display())
                }
            }
            BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
            BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => lhs.to_number().partial_cmp(&rhs.to_number()),
                };
                Value::Bool(ordering.is_some_and(|o| match op {
                    BinaryOp::Lt => o.is_lt(),
                    BinaryOp::Le => o.is_le(),
                    BinaryOp::Gt => o.is_gt(),
                    _ => o.is_ge(),
                }))
            }
            BinaryOp::Eq => Value::Bool(lhs.loose_eq(&rhs)),
            BinaryOp::Ne => Value::Bool(!lhs.loose_eq(&rhs)),
            BinaryOp::StrictEq => Value::Bool(lhs.strict_eq(&rhs)),
            BinaryOp::StrictNe => Value::Bool(!lhs.strict_eq(&rhs)),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => rhs,
        })
    }

    fn call(
        &self,
        callee: &Expr,
        args: &[Expr],
        scope: &Rc<Scope<'a>>,
    ) -> Result<Value<'a>, ExprError> {
        let args = args
            .iter()
            .map(|arg| self.eval(arg, scope))
            .collect::<Result<Vec<_>, _>>()?;

        match callee {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval(object, scope)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.method(&target, property, args)
            }
            Expr::Ident(name) if scope.lookup(name).is_none() => self.helper(name, args),
            other => match self.eval(other, scope)? {
                Value::Lambda(lambda) => self.invoke(&lambda, args),
                value => Err(ExprError::UnknownFunction(value.type_name().to_string())),
            },
        }
    }

    fn invoke(&self, lambda: &Lambda<'a>, args: Vec<Value<'a>>) -> Result<Value<'a>, ExprError> {
        let mut args = args.into_iter();
        let vars: HashMap<_, _> = lambda
            .params
            .iter()
            .map(|p| (p.clone(), args.next().unwrap_or(Value::Undefined)))
            .collect();
        let scope = Scope::child(&lambda.scope, vars);
        self.eval(&lambda.body, &scope)
    }

    /// Functions from the fixed helper registry.
    fn helper(&self, name: &str, args: Vec<Value<'a>>) -> Result<Value<'a>, ExprError> {
        let first = args.first().cloned().unwrap_or(Value::Undefined);
        match name {
            "include" => {
                let path = first.to_display();
                Ok(Value::str(self.env.host.include(&path, self.env)?))
            }
            "escapeHtml" => Ok(Value::str(util::html_escape(&first.substitution()))),
            "json" => Ok(Value::str(first.to_json().to_string())),
            "lower" => Ok(Value::str(first.substitution().to_lowercase())),
            "upper" => Ok(Value::str(first.substitution().to_uppercase())),
            "formatDate" => {
                let raw = first.substitution();
                let format = match args.get(1) {
                    Some(Value::Str(f)) => f.to_string(),
                    _ => "%Y-%m-%d".to_string(),
                };
                let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
                if items.iter().any(|item| matches!(item, Item::Error)) {
                    return Err(ExprError::Syntax {
                        message: "invalid date format".to_string(),
                        expression: format.clone(),
                    });
                }
                Ok(match util::parse_date(&raw) {
                    Some(date) => Value::str(date.format_with_items(items.into_iter()).to_string()),
                    None => Value::str(raw),
                })
            }
            _ => Err(ExprError::UnknownFunction(name.to_string())),
        }
    }

    fn method(
        &self,
        target: &Value<'a>,
        method: &str,
        args: Vec<Value<'a>>,
    ) -> Result<Value<'a>, ExprError> {
        let unknown = || ExprError::UnknownMethod {
            method: method.to_string(),
            target: target.type_name(),
        };

        if let Value::Str(s) = target {
            return string_method(s, method, &args).ok_or_else(unknown);
        }
        if let Value::Number(n) = target {
            return match method {
                "toFixed" => {
                    let digits = args.first().map_or(0.0, Value::to_number).clamp(0.0, 100.0) as usize;
                    Ok(Value::str(format!("{n:.digits$}")))
                }
                "toString" => Ok(Value::str(format_number(*n))),
                _ => Err(unknown()),
            };
        }
        if let Some(items) = target.items() {
            return self.array_method(items, method, args, unknown);
        }
        if let Value::Json(Json::Object(map)) = target {
            let key = args.first().map(Value::to_display).unwrap_or_default();
            return match method {
                "get" => Ok(self.property(target, &key)),
                "has" => Ok(Value::Bool(map.contains_key(&key))),
                "keys" => Ok(Value::Array(map.keys().map(|k| Value::str(k.clone())).collect())),
                "values" => Ok(Value::Array(map.values().map(Value::from_json).collect())),
                _ => Err(unknown()),
            };
        }
        Err(unknown())
    }

    fn array_method(
        &self,
        items: Vec<Value<'a>>,
        method: &str,
        args: Vec<Value<'a>>,
        unknown: impl FnOnce() -> ExprError,
    ) -> Result<Value<'a>, ExprError> {
        let callback = || match args.first() {
            Some(Value::Lambda(lambda)) => Ok(lambda.clone()),
            _ => Err(ExprError::Syntax {
                message: format!("{method}() expects a function"),
                expression: method.to_string(),
            }),
        };

        match method {
            "map" => {
                let f = callback()?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(self.invoke(&f, vec![item, Value::Number(i as f64)])?);
                }
                Ok(Value::Array(out))
            }
            "filter" => {
                let f = callback()?;
                let mut out = Vec::new();
                for (i, item) in items.into_iter().enumerate() {
                    if self.invoke(&f, vec![item.clone(), Value::Number(i as f64)])?.truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::Array(out))
            }
            "find" => {
                let f = callback()?;
                for (i, item) in items.into_iter().enumerate() {
                    if self.invoke(&f, vec![item.clone(), Value::Number(i as f64)])?.truthy() {
                        return Ok(item);
                    }
                }
                Ok(Value::Undefined)
            }
            "slice" => {
                let (start, end) = slice_bounds(items.len(), &args);
                Ok(Value::Array(items[start..end].to_vec()))
            }
            "join" => {
                let separator = match args.first() {
                    Some(v) if !matches!(v, Value::Undefined) => v.to_display(),
                    _ => ",".to_string(),
                };
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                    .collect();
                Ok(Value::str(parts.join(&separator)))
            }
            "includes" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(Value::Bool(items.iter().any(|v| v.strict_eq(&needle))))
            }
            "reverse" => Ok(Value::Array(items.into_iter().rev().collect())),
            "length" => Ok(Value::Number(items.len() as f64)),
            _ => Err(unknown()),
        }
    }
}

/// `+` adds only when neither side is a string or collection.
fn is_numeric(value: &Value<'_>) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
    )
}

/// Resolve `slice(start, end)` arguments, negative values counting from the end.
fn slice_bounds(len: usize, args: &[Value<'_>]) -> (usize, usize) {
    let resolve = |value: Option<&Value<'_>>, default: usize| match value {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() {
                0
            } else if n < 0.0 {
                len.saturating_sub((-n) as usize)
            } else {
                (n as usize).min(len)
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

fn string_method<'a>(s: &str, method: &str, args: &[Value<'a>]) -> Option<Value<'a>> {
    let arg = |i: usize| args.get(i).map(Value::to_display).unwrap_or_default();
    Some(match method {
        "toUpperCase" => Value::str(s.to_uppercase()),
        "toLowerCase" => Value::str(s.to_lowercase()),
        "trim" => Value::str(s.trim()),
        "includes" => Value::Bool(s.contains(&arg(0))),
        "startsWith" => Value::Bool(s.starts_with(&arg(0))),
        "endsWith" => Value::Bool(s.ends_with(&arg(0))),
        "replace" => Value::str(s.replacen(&arg(0), &arg(1), 1)),
        "replaceAll" => Value::str(s.replace(&arg(0), &arg(1))),
        "split" => {
            let parts: Vec<Value<'a>> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::str(s)],
                Some(sep) => {
                    let sep = sep.to_display();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            Value::Array(parts)
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Value::str(chars[start..end].iter().collect::<String>())
        }
        "length" => Value::Number(s.chars().count() as f64),
        "toString" => Value::str(s),
        _ => return None,
    })
}
