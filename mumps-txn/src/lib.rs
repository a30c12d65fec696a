// A transaction is a private, deep-copied view of every global in the
// store. Reads and writes inside the transaction only ever touch this
// private copy; nothing becomes visible to other connections until
// `commit` swaps the whole copy back into the store under its exclusive
// lock. `rollback` (or simply dropping the transaction) discards the copy
// and the store is left exactly as it was at `begin`.
//
// This gives snapshot isolation, not serializability: a transaction does
// not notice concurrent commits made by other connections while it is
// open, and a late commit silently overwrites whatever happened in the
// store meanwhile. Only one transaction may be open per connection at a
// time -- enforcing that is the caller's job (the session layer), not
// this crate's.

#![allow(dead_code)]

use std::collections::BTreeMap;

use mumps_base::{err, Result};
use mumps_model::{normalize_global_name, Path, Value};
use mumps_store::{GlobalStore, TreeNode};

pub struct Transaction {
    globals: BTreeMap<String, TreeNode>,
}

impl Transaction {
    /// Deep-copies every live global out of `store`. The transaction owns
    /// its own copy from this point on; the store is untouched until
    /// `commit`.
    pub fn begin(store: &GlobalStore) -> Self {
        Transaction {
            globals: store.snapshot_map(),
        }
    }

    fn validate_global_name(raw: &str) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(err("global name must not be empty"));
        }
        Ok(normalize_global_name(raw))
    }

    pub fn set(&mut self, global: &str, path: &Path, value: Value) -> Result<()> {
        let global = Self::validate_global_name(global)?;
        let node = self.globals.entry(global).or_insert_with(TreeNode::new);
        node.set(path.elements(), value);
        Ok(())
    }

    pub fn get(&self, global: &str, path: &Path) -> Result<Option<Value>> {
        let global = Self::validate_global_name(global)?;
        Ok(self
            .globals
            .get(&global)
            .and_then(|node| node.get(path.elements()))
            .cloned())
    }

    pub fn kill(&mut self, global: &str, path: &Path) -> Result<()> {
        let global = Self::validate_global_name(global)?;
        if path.is_root() {
            self.globals.remove(&global);
        } else if let Some(node) = self.globals.get_mut(&global) {
            let became_empty = node.remove(path.elements());
            if became_empty {
                self.globals.remove(&global);
            }
        }
        Ok(())
    }

    pub fn query(&self, global: &str, path: &Path, depth: usize) -> Result<Vec<(Path, Value)>> {
        let global = Self::validate_global_name(global)?;
        Ok(self
            .globals
            .get(&global)
            .map(|node| node.query(path.elements(), depth))
            .unwrap_or_default())
    }

    pub fn list_global_names(&self) -> Vec<String> {
        self.globals.keys().cloned().collect()
    }

    pub fn child_subscripts(
        &self,
        global: &str,
        path: &Path,
    ) -> Result<Vec<mumps_model::SubscriptElement>> {
        let global = Self::validate_global_name(global)?;
        Ok(self
            .globals
            .get(&global)
            .map(|node| node.child_subscripts_at(path.elements()))
            .unwrap_or_default())
    }

    /// Atomically replaces the store's live state with this transaction's
    /// private copy. After this call the transaction is consumed; there is
    /// nothing left to roll back.
    pub fn commit(self, store: &GlobalStore) {
        store.replace_all(self.globals);
    }

    /// Discards the transaction's private copy. Equivalent to simply
    /// dropping it, spelled out for callers that want the intent explicit.
    pub fn rollback(self) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use mumps_model::SubscriptElement;

    fn p(elems: Vec<SubscriptElement>) -> Path {
        Path(elems)
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let store = GlobalStore::new(100);
        let mut tx = Transaction::begin(&store);
        tx.set("^A", &Path::root(), Value::Int(1)).unwrap();
        tx.commit(&store);
        assert_eq!(store.get("^A", &Path::root()).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_rollback_restores_begin_state() {
        let store = GlobalStore::new(100);
        store.set("^A", &Path::root(), Value::Int(1)).unwrap();

        let mut tx = Transaction::begin(&store);
        tx.set("^A", &Path::root(), Value::Int(2)).unwrap();
        tx.kill("^B", &Path::root()).unwrap();
        tx.rollback();

        assert_eq!(store.get("^A", &Path::root()).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_transaction_does_not_see_concurrent_commits() {
        let store = GlobalStore::new(100);
        let tx = Transaction::begin(&store);
        store.set("^A", &Path::root(), Value::Int(99)).unwrap();
        assert_eq!(tx.get("^A", &Path::root()).unwrap(), None);
    }

    #[test]
    fn test_set_get_kill_within_transaction() {
        let store = GlobalStore::new(100);
        let mut tx = Transaction::begin(&store);
        tx.set(
            "^P",
            &p(vec![SubscriptElement::Int(1), SubscriptElement::Str("name".into())]),
            Value::Str("John".into()),
        )
        .unwrap();
        assert_eq!(
            tx.get(
                "^P",
                &p(vec![SubscriptElement::Int(1), SubscriptElement::Str("name".into())])
            )
            .unwrap(),
            Some(Value::Str("John".into()))
        );
        tx.kill("^P", &p(vec![SubscriptElement::Int(1)])).unwrap();
        assert_eq!(
            tx.get(
                "^P",
                &p(vec![SubscriptElement::Int(1), SubscriptElement::Str("name".into())])
            )
            .unwrap(),
            None
        );
    }

    #[test]
    fn test_empty_global_name_rejected() {
        let store = GlobalStore::new(100);
        let mut tx = Transaction::begin(&store);
        assert!(tx.set("", &Path::root(), Value::Int(1)).is_err());
    }
}
