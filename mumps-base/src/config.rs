// Flat key/value configuration file, per the server config table: lines of
// `key.path = value`, `#`-prefixed comments, blank lines ignored. No nesting,
// no types beyond what each accessor parses on demand -- this mirrors the
// plainness of the line protocol the rest of the system speaks.

use std::collections::HashMap;
use std::path::Path;

use crate::{err, Result};

#[derive(Debug, Clone)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn defaults() -> Self {
        let mut values = HashMap::new();
        values.insert("server.port".to_string(), "9090".to_string());
        values.insert(
            "persistence.snapshot.file".to_string(),
            "database.snapshot".to_string(),
        );
        values.insert(
            "persistence.aof.file".to_string(),
            "commands.aof".to_string(),
        );
        values.insert(
            "persistence.auto.save.interval".to_string(),
            "5".to_string(),
        );
        values.insert(
            "database.auto.embedding.enabled".to_string(),
            "true".to_string(),
        );
        values.insert(
            "rag.embedding.model".to_string(),
            "all-minilm:22m".to_string(),
        );
        values.insert("rag.similarity.threshold".to_string(), "0.85".to_string());
        values.insert("rag.search.default.topk".to_string(), "10".to_string());
        values.insert("cache.max.size".to_string(), "10000".to_string());
        values.insert("query.max.depth".to_string(), "50".to_string());
        Config { values }
    }

    /// Loads a config file over the defaults: any key present in the file
    /// overrides the default, any key absent keeps its default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::defaults();
        let text = std::fs::read_to_string(path)?;
        cfg.apply_text(&text)?;
        Ok(cfg)
    }

    pub fn apply_text(&mut self, text: &str) -> Result<()> {
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, val) = line.split_once('=').ok_or_else(|| {
                err(format!("config line {}: missing '=': {raw:?}", lineno + 1))
            })?;
            self.values
                .insert(key.trim().to_string(), val.trim().to_string());
        }
        Ok(())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Result<u64> {
        let raw = self
            .values
            .get(key)
            .ok_or_else(|| err(format!("missing config key {key:?}")))?;
        raw.parse::<u64>()
            .map_err(|_| err(format!("config key {key:?} is not an integer: {raw:?}")))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        let raw = self
            .values
            .get(key)
            .ok_or_else(|| err(format!("missing config key {key:?}")))?;
        raw.parse::<f64>()
            .map_err(|_| err(format!("config key {key:?} is not a number: {raw:?}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let raw = self
            .values
            .get(key)
            .ok_or_else(|| err(format!("missing config key {key:?}")))?;
        match raw.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(err(format!("config key {key:?} is not a boolean: {raw:?}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults();
        assert_eq!(cfg.get_u64("server.port").unwrap(), 9090);
        assert_eq!(cfg.get_bool("database.auto.embedding.enabled").unwrap(), true);
        assert_eq!(cfg.get_u64("query.max.depth").unwrap(), 50);
    }

    #[test]
    fn test_override() {
        let mut cfg = Config::defaults();
        cfg.apply_text("server.port = 7777\n# a comment\n\ncache.max.size=500\n")
            .unwrap();
        assert_eq!(cfg.get_u64("server.port").unwrap(), 7777);
        assert_eq!(cfg.get_u64("cache.max.size").unwrap(), 500);
        // Untouched key keeps its default.
        assert_eq!(cfg.get_u64("persistence.auto.save.interval").unwrap(), 5);
    }

    #[test]
    fn test_malformed_line() {
        let mut cfg = Config::defaults();
        assert!(cfg.apply_text("not-a-kv-line").is_err());
    }
}
