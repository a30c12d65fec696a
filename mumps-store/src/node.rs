// A TreeNode is one point in a global's tree: it may hold a scalar `data`
// value and/or have ordered children. `children` is a BTreeMap so that
// iteration order falls directly out of `SubscriptElement`'s `Ord` impl --
// no separate sort step is needed to satisfy the ordering invariant that
// `$ORDER` and `query` depend on.
//
// Per the per-node cache Open Question (see SPEC_FULL.md §4): this type
// intentionally carries no cache of its own. The one bounded cache in the
// system lives at `GlobalStore`, keyed by the canonical path encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mumps_model::{Path, SubscriptElement, Value};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TreeNode {
    data: Option<Value>,
    children: BTreeMap<SubscriptElement, TreeNode>,
}

impl TreeNode {
    pub fn new() -> Self {
        TreeNode::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.children.is_empty()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Walks `path`, creating intermediate nodes as needed, and writes
    /// `data` at the terminal node.
    pub fn set(&mut self, path: &[SubscriptElement], value: Value) {
        match path.split_first() {
            None => self.data = Some(value),
            Some((head, rest)) => {
                self.children
                    .entry(head.clone())
                    .or_default()
                    .set(rest, value);
            }
        }
    }

    /// Returns `data` at the terminal node, or `None` if any edge along
    /// `path` is missing.
    pub fn get(&self, path: &[SubscriptElement]) -> Option<&Value> {
        match path.split_first() {
            None => self.data.as_ref(),
            Some((head, rest)) => self.children.get(head).and_then(|child| child.get(rest)),
        }
    }

    /// Clears `data` at the terminal node and unwinds the recursion,
    /// removing any child edge whose subtree became empty. Returns whether
    /// `self` itself is now empty, so the caller can keep pruning upward.
    pub fn remove(&mut self, path: &[SubscriptElement]) -> bool {
        match path.split_first() {
            None => {
                self.data = None;
            }
            Some((head, rest)) => {
                let mut drop_child = false;
                if let Some(child) = self.children.get_mut(head) {
                    if child.remove(rest) {
                        drop_child = true;
                    }
                }
                if drop_child {
                    self.children.remove(head);
                }
            }
        }
        self.is_empty()
    }

    /// Descends along `path`; if the terminal node exists, emits its value
    /// (if non-null) followed by every non-null value found within `depth`
    /// further levels below it, each paired with its full subscript path
    /// from the query point (not from the global root).
    pub fn query(&self, path: &[SubscriptElement], depth: usize) -> Vec<(Path, Value)> {
        let Some(node) = self.descend(path) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let Some(v) = &node.data {
            out.push((Path::root(), v.clone()));
        }
        node.collect_below(depth, &mut Vec::new(), &mut out);
        out
    }

    fn descend(&self, path: &[SubscriptElement]) -> Option<&TreeNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.children.get(head).and_then(|c| c.descend(rest)),
        }
    }

    fn collect_below(
        &self,
        depth: usize,
        prefix: &mut Vec<SubscriptElement>,
        out: &mut Vec<(Path, Value)>,
    ) {
        if depth == 0 {
            return;
        }
        for (sub, child) in self.children.iter() {
            prefix.push(sub.clone());
            if let Some(v) = &child.data {
                out.push((Path(prefix.clone()), v.clone()));
            }
            child.collect_below(depth - 1, prefix, out);
            prefix.pop();
        }
    }

    /// Ordered view of the direct children's subscripts.
    pub fn child_subscripts(&self) -> Vec<&SubscriptElement> {
        self.children.keys().collect()
    }

    /// Ordered children of the node addressed by `path`, or an empty
    /// vector if `path` doesn't resolve to a live node. Used by `$ORDER`
    /// to enumerate the sibling set at an arbitrary tree level.
    pub fn child_subscripts_at(&self, path: &[SubscriptElement]) -> Vec<SubscriptElement> {
        self.descend(path)
            .map(|node| node.child_subscripts().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn child(&self, sub: &SubscriptElement) -> Option<&TreeNode> {
        self.children.get(sub)
    }

    pub fn deep_copy(&self) -> TreeNode {
        self.clone()
    }

    pub fn count_nodes(&self) -> usize {
        let mut count = if self.data.is_some() { 1 } else { 0 };
        for child in self.children.values() {
            count += child.count_nodes();
        }
        count
    }

    /// All (path, value) pairs reachable from this node, full paths
    /// relative to this node, in subscript order.
    pub fn all_paths_with_values(&self) -> Vec<(Path, Value)> {
        let mut out = Vec::new();
        if let Some(v) = &self.data {
            out.push((Path::root(), v.clone()));
        }
        self.collect_below(usize::MAX, &mut Vec::new(), &mut out);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(n: i64) -> SubscriptElement {
        SubscriptElement::Int(n)
    }
    fn ss(s_: &str) -> SubscriptElement {
        SubscriptElement::Str(s_.to_string())
    }

    #[test]
    fn test_set_get_root() {
        let mut n = TreeNode::new();
        n.set(&[], Value::Int(1));
        assert_eq!(n.get(&[]), Some(&Value::Int(1)));
    }

    #[test]
    fn test_set_get_nested() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("name")], Value::Str("John".to_string()));
        assert_eq!(n.get(&[s(1), ss("name")]), Some(&Value::Str("John".to_string())));
        assert_eq!(n.get(&[s(1)]), None);
        assert_eq!(n.get(&[s(2)]), None);
    }

    #[test]
    fn test_remove_prunes_empty_ancestors() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("name")], Value::Str("John".to_string()));
        let became_empty = n.remove(&[s(1), ss("name")]);
        assert!(became_empty);
        assert_eq!(n.get(&[s(1), ss("name")]), None);
        assert!(n.child(&s(1)).is_none());
    }

    #[test]
    fn test_remove_keeps_sibling_data() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("name")], Value::Str("John".to_string()));
        n.set(&[s(1), ss("age")], Value::Int(35));
        n.remove(&[s(1), ss("name")]);
        assert_eq!(n.get(&[s(1), ss("age")]), Some(&Value::Int(35)));
        assert!(n.child(&s(1)).is_some());
    }

    #[test]
    fn test_no_empty_node_reachable() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("a")], Value::Int(1));
        n.set(&[s(1), ss("b")], Value::Int(2));
        n.remove(&[s(1), ss("a")]);
        n.remove(&[s(1), ss("b")]);
        // Entire ^G(1) subtree should be gone now.
        assert!(n.child(&s(1)).is_none());
        assert!(n.is_empty());
    }

    #[test]
    fn test_child_subscripts_ordered() {
        let mut n = TreeNode::new();
        n.set(&[s(10)], Value::Int(0));
        n.set(&[s(2)], Value::Int(0));
        n.set(&[s(1)], Value::Int(0));
        let subs: Vec<SubscriptElement> = n.child_subscripts().into_iter().cloned().collect();
        assert_eq!(subs, vec![s(1), s(2), s(10)]);
    }

    #[test]
    fn test_query_depth() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("name")], Value::Str("John".to_string()));
        n.set(&[s(1), ss("age")], Value::Int(35));
        let results = n.query(&[s(1)], 1);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_child_subscripts_at_nested() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("b")], Value::Int(0));
        n.set(&[s(1), ss("a")], Value::Int(0));
        let subs = n.child_subscripts_at(&[s(1)]);
        assert_eq!(subs, vec![ss("a"), ss("b")]);
        assert!(n.child_subscripts_at(&[s(99)]).is_empty());
    }

    #[test]
    fn test_count_nodes() {
        let mut n = TreeNode::new();
        n.set(&[s(1), ss("name")], Value::Str("John".to_string()));
        n.set(&[s(1), ss("age")], Value::Int(35));
        assert_eq!(n.count_nodes(), 2);
    }
}
