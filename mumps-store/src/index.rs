// Two index structures maintained on every successful mutation. Entries are
// hints, not ground truth: `GlobalStore::fast_search` always reverifies by
// re-reading the node before returning a triple, and prunes stale entries it
// notices along the way.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct Indexes {
    /// value-as-text -> set of global names that currently contain it.
    value_index: HashMap<String, HashSet<String>>,
    /// global name -> value-as-text -> set of canonical path keys.
    path_value_index: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl Indexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, global: &str, value_text: &str, path_key: &str) {
        self.value_index
            .entry(value_text.to_string())
            .or_default()
            .insert(global.to_string());
        self.path_value_index
            .entry(global.to_string())
            .or_default()
            .entry(value_text.to_string())
            .or_default()
            .insert(path_key.to_string());
    }

    /// Removes a single (global, value, pathkey) triple. If this was the
    /// last path in `global` carrying `value_text`, the global is also
    /// dropped from `value_index`'s set for that value.
    pub fn forget(&mut self, global: &str, value_text: &str, path_key: &str) {
        if let Some(by_value) = self.path_value_index.get_mut(global) {
            if let Some(paths) = by_value.get_mut(value_text) {
                paths.remove(path_key);
                if paths.is_empty() {
                    by_value.remove(value_text);
                    if let Some(globals) = self.value_index.get_mut(value_text) {
                        globals.remove(global);
                        if globals.is_empty() {
                            self.value_index.remove(value_text);
                        }
                    }
                }
            }
            if by_value.is_empty() {
                self.path_value_index.remove(global);
            }
        }
    }

    /// Drops every index entry for a global, e.g. after a full `kill`.
    pub fn forget_global(&mut self, global: &str) {
        if let Some(by_value) = self.path_value_index.remove(global) {
            for value_text in by_value.keys() {
                if let Some(globals) = self.value_index.get_mut(value_text) {
                    globals.remove(global);
                    if globals.is_empty() {
                        self.value_index.remove(value_text);
                    }
                }
            }
        }
    }

    pub fn candidate_globals(&self, value_text: &str) -> Vec<String> {
        self.value_index
            .get(value_text)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn candidate_paths(&self, global: &str, value_text: &str) -> Vec<String> {
        self.path_value_index
            .get(global)
            .and_then(|by_value| by_value.get(value_text))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.path_value_index
            .values()
            .map(|by_value| by_value.values().map(|p| p.len()).sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_record_and_candidates() {
        let mut idx = Indexes::new();
        idx.record("^U", "apple", "1");
        idx.record("^V", "apple", "k");
        let mut globals = idx.candidate_globals("apple");
        globals.sort();
        assert_eq!(globals, vec!["^U".to_string(), "^V".to_string()]);
        assert_eq!(idx.candidate_paths("^U", "apple"), vec!["1".to_string()]);
    }

    #[test]
    fn test_forget_removes_empty_entries() {
        let mut idx = Indexes::new();
        idx.record("^U", "apple", "1");
        idx.forget("^U", "apple", "1");
        assert!(idx.candidate_globals("apple").is_empty());
        assert!(idx.candidate_paths("^U", "apple").is_empty());
    }

    #[test]
    fn test_forget_global() {
        let mut idx = Indexes::new();
        idx.record("^U", "apple", "1");
        idx.record("^U", "pear", "2");
        idx.forget_global("^U");
        assert!(idx.candidate_globals("apple").is_empty());
        assert!(idx.candidate_globals("pear").is_empty());
    }
}
