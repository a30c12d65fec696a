// The scalar stored at a tree node. No binary blobs in the core -- only
// null, integer, floating, and string tags, per the data model.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parses a bare (unquoted) literal the way the command parser does:
    /// integer if it has no decimal point, floating otherwise, falling
    /// back to a bare string for anything that doesn't parse as a number.
    pub fn parse_bare_literal(raw: &str) -> Value {
        if !raw.contains('.') {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::Int(n);
            }
        } else if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(OrderedFloat(f));
        }
        Value::Str(raw.to_string())
    }

    /// WRITE/ZWRITE text rendering: null as empty string, numbers bare,
    /// strings bare (unquoted) -- quoting is only applied by
    /// `render_zwrite_quoted`, used for the ZWRITE node form.
    pub fn render_plain(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{}", f.0),
            Value::Str(s) => s.clone(),
        }
    }

    /// ZWRITE round-trip rendering of the right-hand side: numbers bare,
    /// strings double-quoted with embedded `"` doubled.
    pub fn render_zwrite(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{}", f.0),
            Value::Str(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render_plain())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(OrderedFloat(n))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
