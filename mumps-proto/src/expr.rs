// The value-expression language is small: a quoted string or bare number
// literal, a global reference, a local variable name, or an `$ORDER`
// call. Parsing produces an AST; evaluating it against live state is the
// caller's job, expressed here as the `ExprContext` trait so this crate
// never has to depend on the store or session layers.

use mumps_base::{err, Result};
use mumps_model::{Path, SubscriptElement, Value};

use crate::globalref::split_global_ref;
use crate::subscripts::{parse_path, split_top_level};

#[derive(Clone, Debug, PartialEq)]
pub enum ValueExpr {
    Literal(Value),
    GlobalRef { global: String, path: Path },
    LocalRef(String),
    Order {
        global: String,
        subscripts: Vec<String>,
        direction: i32,
    },
}

/// Supplies the live values a `ValueExpr` needs during evaluation.
/// `order` implements the full five-step `$ORDER` algorithm against the
/// caller's own tree/local-variable state and returns the empty string
/// convention as `None`... no: per the line protocol "no next/previous"
/// renders as an empty string subscript, which callers represent as
/// `SubscriptElement::from_str_literal(String::new())`.
pub trait ExprContext {
    fn get_local(&self, name: &str) -> Option<Value>;
    fn get_global(&self, global: &str, path: &Path) -> Option<Value>;
    fn order(&self, global: &str, raw_subscripts: &[String], direction: i32) -> SubscriptElement;
}

impl ValueExpr {
    pub fn evaluate(&self, ctx: &dyn ExprContext) -> Value {
        match self {
            ValueExpr::Literal(v) => v.clone(),
            ValueExpr::GlobalRef { global, path } => {
                ctx.get_global(global, path).unwrap_or(Value::Null)
            }
            ValueExpr::LocalRef(name) => ctx.get_local(name).unwrap_or(Value::Null),
            ValueExpr::Order {
                global,
                subscripts,
                direction,
            } => Value::from(ctx.order(global, subscripts, *direction).as_text()),
        }
    }
}

fn is_order_call(trimmed: &str) -> bool {
    let upper = trimmed.to_ascii_uppercase();
    (upper.starts_with("$ORDER(") || upper.starts_with("$O(")) && upper.ends_with(')')
}

/// Quote- and paren-aware split of a function call's argument list, e.g.
/// splitting `^G(1,2), -1` into `["^G(1,2)", "-1"]` without being fooled
/// by the comma inside `^G(1,2)`.
fn split_call_args(s: &str) -> Vec<String> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut quote: Option<u8> = None;
    let mut depth = 0i32;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 2;
                    continue;
                }
                quote = None;
            }
            Some(_) => {}
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' => depth += 1,
                b')' => depth -= 1,
                b',' if depth == 0 => {
                    parts.push(s[start..i].to_string());
                    start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(s[start..].to_string());
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

fn parse_literal(trimmed: &str) -> Option<Value> {
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let q = bytes[0];
        if (q == b'"' || q == b'\'') && bytes[bytes.len() - 1] == q {
            let inner = &trimmed[1..trimmed.len() - 1];
            let doubled = format!("{}{}", q as char, q as char);
            return Some(Value::from(inner.replace(&doubled, &(q as char).to_string())));
        }
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Some(Value::from(f));
    }
    None
}

pub fn parse_value_expr(raw: &str) -> Result<ValueExpr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err("empty value expression"));
    }

    if is_order_call(trimmed) {
        let open = trimmed.find('(').unwrap();
        let inner = &trimmed[open + 1..trimmed.len() - 1];
        let args = split_call_args(inner);
        let Some(first) = args.first() else {
            return Err(err("$ORDER requires a global argument"));
        };
        let (global, subscript_text) = split_global_ref(first)
            .ok_or_else(|| err("$ORDER's first argument must be a global reference"))?;
        let subscripts = split_top_level(&subscript_text);
        let direction = match args.get(1) {
            None => 1,
            Some(d) => d
                .trim()
                .parse::<i32>()
                .map_err(|_| err(format!("invalid $ORDER direction: {d}")))?,
        };
        if direction != 1 && direction != -1 {
            return Err(err(format!("invalid $ORDER direction: {direction}")));
        }
        return Ok(ValueExpr::Order {
            global,
            subscripts,
            direction,
        });
    }

    if let Some((global, subscript_text)) = split_global_ref(trimmed) {
        return Ok(ValueExpr::GlobalRef {
            global,
            path: parse_path(&subscript_text),
        });
    }

    if let Some(v) = parse_literal(trimmed) {
        return Ok(ValueExpr::Literal(v));
    }

    Ok(ValueExpr::LocalRef(trimmed.to_string()))
}

/// Parses a comma-separated list of value expressions, e.g. a `WRITE`
/// argument list.
pub fn parse_value_expr_list(raw: &str) -> Result<Vec<ValueExpr>> {
    split_call_args(raw)
        .into_iter()
        .map(|tok| parse_value_expr(&tok))
        .collect()
}
