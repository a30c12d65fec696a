use mumps_model::{Path, Value};
use mumps_store::StoreStats;

pub const NO_RESULTS: &str = "NO RESULTS";

/// Canonical round-trip rendering of one node: `^G(k1,"s")=value`.
pub fn render_zwrite_node(global: &str, path: &Path, value: &Value) -> String {
    if path.is_root() {
        format!("{global}={}", value.render_zwrite())
    } else {
        format!("{global}({})={}", path.render_zwrite_subscripts(), value.render_zwrite())
    }
}

pub fn render_query_results(global: &str, base: &Path, results: &[(Path, Value)]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, (rel, value))| {
            let mut full = base.elements().to_vec();
            full.extend(rel.elements().iter().cloned());
            format!("{}. {}", i + 1, render_zwrite_node(global, &Path(full), value))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_search_results(results: &[(String, Path, Value)]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    results
        .iter()
        .map(|(global, path, value)| render_zwrite_node(global, path, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_stats(stats: &StoreStats, embedding_count: u64) -> String {
    let memory_usage = stats.total_nodes * 100;
    [
        format!("globalCount={}", stats.global_count),
        format!("totalNodes={}", stats.total_nodes),
        format!("memoryUsage={memory_usage}"),
        format!("embeddingCount={embedding_count}"),
        format!("cacheSize={}", stats.cache_size),
        format!("indexSize={}", stats.index_size),
    ]
    .join("\n")
}

pub const HELP_TEXT: &str = "\
SET target=value      -- assign a local variable or global node
GET ^G(subs)           -- read a global node
KILL ^G(subs)          -- remove a global node and its descendants
QUERY ^G [DEPTH n]     -- list nodes under a global, n levels deep (default 1)
WRITE expr[,expr...]   -- print a concatenation of literals/globals/locals
ZW | ZWRITE [^G|filter]-- list globals, or dump one subtree in round-trip form
FSEARCH value          -- index-backed search for an exact value
EXACTSEARCH q [IN ^G]  -- linear scan for an exact value
SIMSEARCH q [TOP n]    -- embedding-backed similarity search
TSTART | COMMIT | ROLLBACK -- transaction control
STATS | $S             -- store statistics
HELP                   -- this text
EXIT                   -- close the connection";

pub const WELCOME_BANNER: &str = "Welcome to MUMPS-like Database Server";

#[cfg(test)]
mod test {
    use super::*;
    use mumps_model::SubscriptElement;

    #[test]
    fn test_render_zwrite_node_root() {
        assert_eq!(render_zwrite_node("^G", &Path::root(), &Value::Int(5)), "^G=5");
    }

    #[test]
    fn test_render_zwrite_node_nested() {
        let path = Path(vec![SubscriptElement::Int(1), SubscriptElement::from_str_literal("a".to_string())]);
        assert_eq!(
            render_zwrite_node("^G", &path, &Value::from("x".to_string())),
            "^G(1,\"a\")=\"x\""
        );
    }

    #[test]
    fn test_render_query_results_empty() {
        assert_eq!(render_query_results("^G", &Path::root(), &[]), NO_RESULTS);
    }
}
