// Path is the ordered sequence of subscripts from a global's root to a
// node. The empty path addresses the root itself.

use serde::{Deserialize, Serialize};

use crate::SubscriptElement;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(pub Vec<SubscriptElement>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn elements(&self) -> &[SubscriptElement] {
        &self.0
    }

    pub fn push(&mut self, elem: SubscriptElement) {
        self.0.push(elem);
    }

    /// Canonical path key: element text forms joined by `:`. Used by both
    /// the path-value index and the store's query cache key.
    pub fn canonical_key(&self) -> String {
        self.0
            .iter()
            .map(SubscriptElement::as_text)
            .collect::<Vec<_>>()
            .join(":")
    }

    /// The subscript-list rendering used inside `^G(...)`, e.g. `1,"a"`.
    pub fn render_zwrite_subscripts(&self) -> String {
        self.0
            .iter()
            .map(SubscriptElement::render_zwrite)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Vec<SubscriptElement>> for Path {
    fn from(v: Vec<SubscriptElement>) -> Self {
        Path(v)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render_zwrite_subscripts())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_canonical_key() {
        let p = Path(vec![
            SubscriptElement::Int(1),
            SubscriptElement::Str("a".to_string()),
        ]);
        assert_eq!(p.canonical_key(), "1:a");
    }

    #[test]
    fn test_root_is_empty() {
        assert!(Path::root().is_root());
    }

    #[test]
    fn test_render_zwrite_subscripts() {
        let p = Path(vec![
            SubscriptElement::Int(1),
            SubscriptElement::Str("name".to_string()),
        ]);
        assert_eq!(p.render_zwrite_subscripts(), "1,\"name\"");
    }
}
