// A SubscriptElement is one element of the ordered path that addresses a
// node in a global's tree. Numeric-looking input is canonicalized to an
// integer tag on ingest so that `^G(1)` and `^G("1")` address the same node
// and compare the same way -- the parser and the store both call
// `SubscriptElement::canonicalize` rather than inventing their own rule.

use std::cmp::Ordering;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SubscriptElement {
    Int(i64),
    Str(String),
}

impl SubscriptElement {
    /// Canonicalizes a raw textual subscript: a string that round-trips
    /// through an i64 becomes `Int`, everything else stays `Str`.
    pub fn canonicalize(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => SubscriptElement::Int(n),
            _ => SubscriptElement::Str(raw),
        }
    }

    pub fn from_int(n: i64) -> Self {
        SubscriptElement::Int(n)
    }

    pub fn from_str_literal(s: impl Into<String>) -> Self {
        SubscriptElement::Str(s.into())
    }

    /// Textual encoding used both for the canonical path key and for
    /// ZWRITE's bare/quoted rendering split.
    pub fn as_text(&self) -> String {
        match self {
            SubscriptElement::Int(n) => n.to_string(),
            SubscriptElement::Str(s) => s.clone(),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, SubscriptElement::Int(_))
    }

    /// ZWRITE round-trip rendering: integers bare, strings double-quoted
    /// with embedded `"` doubled.
    pub fn render_zwrite(&self) -> String {
        match self {
            SubscriptElement::Int(n) => n.to_string(),
            SubscriptElement::Str(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        }
    }
}

// Total order per the data model: integers compare numerically among
// themselves, strings compare byte-wise, and Int < Str whenever the tags
// differ.
impl Ord for SubscriptElement {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SubscriptElement::Int(a), SubscriptElement::Int(b)) => a.cmp(b),
            (SubscriptElement::Str(a), SubscriptElement::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (SubscriptElement::Int(_), SubscriptElement::Str(_)) => Ordering::Less,
            (SubscriptElement::Str(_), SubscriptElement::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SubscriptElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SubscriptElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_canonicalize_integer_like() {
        assert_eq!(SubscriptElement::canonicalize("42"), SubscriptElement::Int(42));
        assert_eq!(SubscriptElement::canonicalize("-7"), SubscriptElement::Int(-7));
    }

    #[test]
    fn test_canonicalize_non_canonical_numeric_stays_string() {
        // Leading zero does not round-trip through i64::to_string, so it
        // stays a string -- this also keeps "007" distinct from "7".
        assert_eq!(
            SubscriptElement::canonicalize("007"),
            SubscriptElement::Str("007".to_string())
        );
        assert_eq!(
            SubscriptElement::canonicalize("abc"),
            SubscriptElement::Str("abc".to_string())
        );
    }

    #[test]
    fn test_ordering_int_before_str() {
        let i = SubscriptElement::Int(9999);
        let s = SubscriptElement::Str("a".to_string());
        assert!(i < s);
    }

    #[test]
    fn test_ordering_numeric() {
        let mut v = vec![
            SubscriptElement::Int(10),
            SubscriptElement::Int(2),
            SubscriptElement::Int(1),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                SubscriptElement::Int(1),
                SubscriptElement::Int(2),
                SubscriptElement::Int(10)
            ]
        );
    }

    #[test]
    fn test_render_zwrite() {
        assert_eq!(SubscriptElement::Int(5).render_zwrite(), "5");
        assert_eq!(
            SubscriptElement::Str("a\"b".to_string()).render_zwrite(),
            "\"a\"\"b\""
        );
    }
}
