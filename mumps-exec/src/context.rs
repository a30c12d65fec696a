// Bridges `mumps-proto`'s context-free `ValueExpr` AST to live state: a
// session's local variables, plus either its open transaction's private
// copy or the shared store directly. `$ORDER`'s five-step algorithm
// (spec'd against an arbitrary tree level, with local-variable
// substitution in its own subscript argument) lives here rather than in
// `mumps-proto`, since it needs exactly this read access.

use mumps_model::{Path, SubscriptElement, Value};
use mumps_proto::{parse_subscript_token, ExprContext};
use mumps_store::GlobalStore;

use crate::session::Session;

pub struct ExecCtx<'a> {
    pub store: &'a GlobalStore,
    pub session: &'a Session,
}

impl<'a> ExecCtx<'a> {
    pub fn new(store: &'a GlobalStore, session: &'a Session) -> Self {
        ExecCtx { store, session }
    }

    fn list_global_names(&self) -> Vec<String> {
        match &self.session.transaction {
            Some(tx) => tx.list_global_names(),
            None => self.store.list_global_names(),
        }
    }

    fn child_subscripts(&self, global: &str, path: &Path) -> Vec<SubscriptElement> {
        match &self.session.transaction {
            Some(tx) => tx.child_subscripts(global, path).unwrap_or_default(),
            None => self.store.child_subscripts(global, path).unwrap_or_default(),
        }
    }

    /// A bare (unquoted) token is substituted with the named local
    /// variable's current value, when one exists by that exact name;
    /// everything else -- quoted text or a bare token with no matching
    /// variable -- is classified the ordinary way.
    fn resolve_subscript_token(&self, token: &str) -> SubscriptElement {
        let is_quoted = token.len() >= 2
            && (token.starts_with('"') || token.starts_with('\''))
            && token.ends_with(token.chars().next().unwrap());
        if !is_quoted {
            if let Some(v) = self.session.get_local(token.trim()) {
                return parse_subscript_token(&v.render_plain());
            }
        }
        parse_subscript_token(token)
    }

    fn neighbor_in_sorted(names: &[String], global: &str, direction: i32) -> Option<String> {
        if direction >= 0 {
            names.iter().find(|n| n.as_str() > global).cloned()
        } else {
            names.iter().rev().find(|n| n.as_str() < global).cloned()
        }
    }

    fn resolve_order(&self, global: &str, raw_subscripts: &[String], direction: i32) -> SubscriptElement {
        if raw_subscripts.is_empty() {
            let names = self.list_global_names();
            let mut sorted = names;
            sorted.sort();
            return Self::neighbor_in_sorted(&sorted, global, direction)
                .map(SubscriptElement::from_str_literal)
                .unwrap_or_else(|| SubscriptElement::from_str_literal(String::new()));
        }

        let resolved: Vec<SubscriptElement> = raw_subscripts
            .iter()
            .map(|tok| self.resolve_subscript_token(tok))
            .collect();
        let (prefix, last) = resolved.split_at(resolved.len() - 1);
        let last = &last[0];

        let children = self.child_subscripts(global, &Path(prefix.to_vec()));

        if last.as_text().is_empty() {
            return match direction {
                d if d >= 0 => children.first().cloned(),
                _ => children.last().cloned(),
            }
            .unwrap_or_else(|| SubscriptElement::from_str_literal(String::new()));
        }

        match children.iter().position(|c| c == last) {
            Some(idx) => {
                let neighbor = if direction >= 0 {
                    children.get(idx + 1)
                } else if idx == 0 {
                    None
                } else {
                    children.get(idx - 1)
                };
                neighbor.cloned().unwrap_or_else(|| SubscriptElement::from_str_literal(String::new()))
            }
            None => SubscriptElement::from_str_literal(String::new()),
        }
    }
}

impl<'a> ExprContext for ExecCtx<'a> {
    fn get_local(&self, name: &str) -> Option<Value> {
        self.session.get_local(name)
    }

    fn get_global(&self, global: &str, path: &Path) -> Option<Value> {
        match &self.session.transaction {
            Some(tx) => tx.get(global, path).ok().flatten(),
            None => self.store.get(global, path).ok().flatten(),
        }
    }

    fn order(&self, global: &str, raw_subscripts: &[String], direction: i32) -> SubscriptElement {
        self.resolve_order(global, raw_subscripts, direction)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_order_over_global_names() {
        let store = GlobalStore::new(100);
        store.set("^A", &Path::root(), Value::Int(1)).unwrap();
        store.set("^C", &Path::root(), Value::Int(1)).unwrap();
        let session = Session::new("s1");
        let ctx = ExecCtx::new(&store, &session);
        assert_eq!(ctx.order("^A", &[], 1), SubscriptElement::from_str_literal("^C".to_string()));
        assert_eq!(ctx.order("^C", &[], 1), SubscriptElement::from_str_literal(String::new()));
    }

    #[test]
    fn test_order_over_children() {
        let store = GlobalStore::new(100);
        store.set("^G", &Path(vec![SubscriptElement::Int(1)]), Value::Int(0)).unwrap();
        store.set("^G", &Path(vec![SubscriptElement::Int(3)]), Value::Int(0)).unwrap();
        let session = Session::new("s1");
        let ctx = ExecCtx::new(&store, &session);
        let next = ctx.order("^G", &["1".to_string()], 1);
        assert_eq!(next, SubscriptElement::Int(3));
        let none = ctx.order("^G", &["3".to_string()], 1);
        assert_eq!(none, SubscriptElement::from_str_literal(String::new()));
    }

    #[test]
    fn test_order_with_variable_substitution() {
        let store = GlobalStore::new(100);
        store.set("^G", &Path(vec![SubscriptElement::Int(1)]), Value::Int(0)).unwrap();
        store.set("^G", &Path(vec![SubscriptElement::Int(5)]), Value::Int(0)).unwrap();
        let mut session = Session::new("s1");
        session.set_local("idx", Value::Int(1));
        let ctx = ExecCtx::new(&store, &session);
        let next = ctx.order("^G", &["idx".to_string()], 1);
        assert_eq!(next, SubscriptElement::Int(5));
    }

    #[test]
    fn test_order_first_child_on_empty_last_element() {
        let store = GlobalStore::new(100);
        store.set("^G", &Path(vec![SubscriptElement::Int(1)]), Value::Int(0)).unwrap();
        store.set("^G", &Path(vec![SubscriptElement::Int(2)]), Value::Int(0)).unwrap();
        let session = Session::new("s1");
        let ctx = ExecCtx::new(&store, &session);
        let first = ctx.order("^G", &[String::new()], 1);
        assert_eq!(first, SubscriptElement::Int(1));
    }
}
