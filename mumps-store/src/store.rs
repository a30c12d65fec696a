// GlobalStore owns every live TreeNode and coordinates concurrent access
// with a single store-level reader/writer lock, per the concurrency
// discipline: writes take exclusive access, reads take shared access.
// Index maintenance happens under the same write guard as the mutation
// that caused it, so a reader can never observe a tree change without the
// matching index update.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use mumps_base::{err, Result};
use mumps_model::{normalize_global_name, Path, SubscriptElement, Value};

use crate::cache::QueryCache;
use crate::index::Indexes;
use crate::node::TreeNode;

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreStats {
    pub global_count: usize,
    pub total_nodes: usize,
    pub cache_size: usize,
    pub index_size: usize,
}

struct StoreState {
    globals: BTreeMap<String, TreeNode>,
    indexes: Indexes,
}

pub struct GlobalStore {
    state: RwLock<StoreState>,
    cache: Mutex<QueryCache>,
    cache_cap: usize,
}

impl GlobalStore {
    pub fn new(cache_cap: usize) -> Self {
        GlobalStore {
            state: RwLock::new(StoreState {
                globals: BTreeMap::new(),
                indexes: Indexes::new(),
            }),
            cache: Mutex::new(QueryCache::new(cache_cap)),
            cache_cap,
        }
    }

    fn validate_global_name(raw: &str) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(err("global name must not be empty"));
        }
        Ok(normalize_global_name(raw))
    }

    pub fn set(&self, global: &str, path: &Path, value: Value) -> Result<()> {
        let global = Self::validate_global_name(global)?;
        let mut state = self.state.write();
        let node = state.globals.entry(global.clone()).or_default();
        node.set(path.elements(), value.clone());

        let path_key = path.canonical_key();
        if !value.is_null() {
            state
                .indexes
                .record(&global, &value.render_plain(), &path_key);
        }
        self.cache.lock().invalidate_global(&global);
        debug!(global = %global, path = %path_key, "set");
        Ok(())
    }

    pub fn get(&self, global: &str, path: &Path) -> Result<Option<Value>> {
        let global = Self::validate_global_name(global)?;
        let path_key = path.canonical_key();

        if let Some(cached) = self.cache.lock().get(&global, &path_key) {
            return Ok(Some(cached.clone()));
        }

        let state = self.state.read();
        let result = state
            .globals
            .get(&global)
            .and_then(|node| node.get(path.elements()))
            .cloned();

        if let Some(v) = &result {
            self.cache.lock().put(&global, &path_key, v.clone());
        }
        Ok(result)
    }

    pub fn kill(&self, global: &str, path: &Path) -> Result<()> {
        let global = Self::validate_global_name(global)?;
        let mut state = self.state.write();

        if path.is_root() {
            state.globals.remove(&global);
            state.indexes.forget_global(&global);
        } else if let Some(node) = state.globals.get_mut(&global) {
            // Collect every value that will vanish under this subtree so we
            // can prune the index entries for exactly those values.
            let removed_path_prefix = path.elements().to_vec();
            let vanished = Self::collect_vanishing(node, &removed_path_prefix);
            let became_root_empty = node.remove(path.elements());
            if became_root_empty {
                state.globals.remove(&global);
            }
            for (full_path, value) in vanished {
                state
                    .indexes
                    .forget(&global, &value.render_plain(), &full_path.canonical_key());
            }
        }
        self.cache.lock().invalidate_global(&global);
        Ok(())
    }

    fn collect_vanishing(node: &TreeNode, prefix: &[SubscriptElement]) -> Vec<(Path, Value)> {
        let Some(sub) = Self::descend_to(node, prefix) else {
            return Vec::new();
        };
        sub.all_paths_with_values()
            .into_iter()
            .map(|(rel, v)| {
                let mut full = prefix.to_vec();
                full.extend(rel.elements().iter().cloned());
                (Path(full), v)
            })
            .collect()
    }

    fn descend_to<'a>(node: &'a TreeNode, path: &[SubscriptElement]) -> Option<&'a TreeNode> {
        match path.split_first() {
            None => Some(node),
            Some((head, rest)) => node.child(head).and_then(|c| Self::descend_to(c, rest)),
        }
    }

    pub fn query(&self, global: &str, path: &Path, depth: usize) -> Result<Vec<(Path, Value)>> {
        let global = Self::validate_global_name(global)?;
        let state = self.state.read();
        Ok(state
            .globals
            .get(&global)
            .map(|node| node.query(path.elements(), depth))
            .unwrap_or_default())
    }

    /// Ordered direct children of the node at `path` within `global`,
    /// used by `$ORDER` to enumerate a sibling set.
    pub fn child_subscripts(&self, global: &str, path: &Path) -> Result<Vec<SubscriptElement>> {
        let global = Self::validate_global_name(global)?;
        let state = self.state.read();
        Ok(state
            .globals
            .get(&global)
            .map(|node| node.child_subscripts_at(path.elements()))
            .unwrap_or_default())
    }

    pub fn list_global_names(&self) -> Vec<String> {
        let state = self.state.read();
        state.globals.keys().cloned().collect()
    }

    /// Consults the value index, then re-reads each candidate node to
    /// confirm before returning -- index entries are hints, never ground
    /// truth on their own (fast-search soundness).
    pub fn fast_search(&self, value: &Value) -> Vec<(String, Path, Value)> {
        let value_text = value.render_plain();
        let state = self.state.read();
        let candidate_globals = state.indexes.candidate_globals(&value_text);
        let mut out = Vec::new();
        for global in candidate_globals {
            let Some(node) = state.globals.get(&global) else {
                continue;
            };
            let candidate_paths = state.indexes.candidate_paths(&global, &value_text);
            for path_key in candidate_paths {
                let elems: Vec<SubscriptElement> = if path_key.is_empty() {
                    Vec::new()
                } else {
                    path_key
                        .split(':')
                        .map(SubscriptElement::canonicalize)
                        .collect()
                };
                if let Some(actual) = node.get(&elems) {
                    if actual == value {
                        out.push((global.clone(), Path(elems), actual.clone()));
                    }
                }
            }
        }
        out
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        let total_nodes = state.globals.values().map(|n| n.count_nodes()).sum();
        StoreStats {
            global_count: state.globals.len(),
            total_nodes,
            cache_size: self.cache.lock().len(),
            index_size: state.indexes.len(),
        }
    }

    /// Deep copy of the full live map, used by `Transaction::begin`.
    pub fn snapshot_map(&self) -> BTreeMap<String, TreeNode> {
        let state = self.state.read();
        state
            .globals
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_copy()))
            .collect()
    }

    /// Atomically replaces the live map and rebuilds indexes from it, used
    /// by `Transaction::commit` and by snapshot restore at startup.
    pub fn replace_all(&self, new_map: BTreeMap<String, TreeNode>) {
        let mut indexes = Indexes::new();
        for (global, node) in new_map.iter() {
            for (path, value) in node.all_paths_with_values() {
                if !value.is_null() {
                    indexes.record(global, &value.render_plain(), &path.canonical_key());
                }
            }
        }
        let mut state = self.state.write();
        state.globals = new_map;
        state.indexes = indexes;
        drop(state);
        *self.cache.lock() = QueryCache::new(self.cache_cap);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn p(elems: Vec<SubscriptElement>) -> Path {
        Path(elems)
    }

    #[test]
    fn test_get_after_set() {
        let store = GlobalStore::new(100);
        store.set("^A", &Path::root(), Value::Int(1)).unwrap();
        assert_eq!(store.get("^A", &Path::root()).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_kill_then_get() {
        let store = GlobalStore::new(100);
        store.set("^A", &Path::root(), Value::Int(1)).unwrap();
        store.kill("^A", &Path::root()).unwrap();
        assert_eq!(store.get("^A", &Path::root()).unwrap(), None);
    }

    #[test]
    fn test_kill_descendant() {
        let store = GlobalStore::new(100);
        store
            .set(
                "^P",
                &p(vec![SubscriptElement::Int(1), SubscriptElement::Str("name".into())]),
                Value::Str("John".into()),
            )
            .unwrap();
        store.kill("^P", &p(vec![SubscriptElement::Int(1)])).unwrap();
        assert_eq!(
            store
                .get("^P", &p(vec![SubscriptElement::Int(1), SubscriptElement::Str("name".into())]))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_empty_global_name_rejected() {
        let store = GlobalStore::new(100);
        assert!(store.set("", &Path::root(), Value::Int(1)).is_err());
    }

    #[test]
    fn test_fast_search_soundness() {
        let store = GlobalStore::new(100);
        store
            .set("^U", &p(vec![SubscriptElement::Int(1)]), Value::Str("apple".into()))
            .unwrap();
        store
            .set("^V", &p(vec![SubscriptElement::Str("k".into())]), Value::Str("apple".into()))
            .unwrap();
        let found = store.fast_search(&Value::Str("apple".into()));
        assert_eq!(found.len(), 2);
        for (g, path, v) in &found {
            assert_eq!(store.get(g, path).unwrap().as_ref(), Some(v));
        }
    }

    #[test]
    fn test_global_name_normalized() {
        let store = GlobalStore::new(100);
        store.set("A", &Path::root(), Value::Int(1)).unwrap();
        assert_eq!(store.get("^A", &Path::root()).unwrap(), Some(Value::Int(1)));
        assert_eq!(store.list_global_names(), vec!["^A".to_string()]);
    }

    #[test]
    fn test_child_subscripts_ordered() {
        let store = GlobalStore::new(100);
        store.set("^G", &p(vec![SubscriptElement::Int(2)]), Value::Int(0)).unwrap();
        store.set("^G", &p(vec![SubscriptElement::Int(1)]), Value::Int(0)).unwrap();
        assert_eq!(
            store.child_subscripts("^G", &Path::root()).unwrap(),
            vec![SubscriptElement::Int(1), SubscriptElement::Int(2)]
        );
    }

    #[test]
    fn test_snapshot_round_trip_structural() {
        let store = GlobalStore::new(100);
        store.set("^A", &Path::root(), Value::Int(1)).unwrap();
        let snap = store.snapshot_map();
        let store2 = GlobalStore::new(100);
        store2.replace_all(snap);
        assert_eq!(store2.get("^A", &Path::root()).unwrap(), Some(Value::Int(1)));
    }
}
