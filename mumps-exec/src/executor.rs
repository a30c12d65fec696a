use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use mumps_base::{err_kind, Kind, Result};
use mumps_collab::{Auth, Embedder, MutationKind, Replicator};
use mumps_model::{Path, Value};
use mumps_proto::{parse_line, AssignTarget, Command, ZWriteTarget};
use mumps_store::GlobalStore;
use mumps_txn::Transaction;

use crate::context::ExecCtx;
use crate::format::{render_query_results, render_search_results, render_stats, HELP_TEXT, NO_RESULTS};
use crate::session::Session;

/// Outcome of executing one input line: the text to send back to the
/// client, whether the session should close, and whether the line
/// changed durable state and is therefore worth an AOF record.
pub struct ExecResult {
    pub output: String,
    pub should_exit: bool,
    pub mutated: bool,
}

impl ExecResult {
    fn text(output: impl Into<String>) -> Self {
        ExecResult { output: output.into(), should_exit: false, mutated: false }
    }

    fn mutation(output: impl Into<String>) -> Self {
        ExecResult { output: output.into(), should_exit: false, mutated: true }
    }
}

pub struct Executor {
    store: Arc<GlobalStore>,
    auth: Arc<dyn Auth>,
    embedder: Arc<dyn Embedder>,
    replicator: Arc<dyn Replicator>,
    default_topk: usize,
    similarity_threshold: f32,
    max_query_depth: usize,
    collaborator_unavailable: AtomicU64,
}

impl Executor {
    pub fn new(
        store: Arc<GlobalStore>,
        auth: Arc<dyn Auth>,
        embedder: Arc<dyn Embedder>,
        replicator: Arc<dyn Replicator>,
        default_topk: usize,
        similarity_threshold: f32,
        max_query_depth: usize,
    ) -> Self {
        Executor {
            store,
            auth,
            embedder,
            replicator,
            default_topk,
            similarity_threshold,
            max_query_depth,
            collaborator_unavailable: AtomicU64::new(0),
        }
    }

    pub fn collaborator_unavailable_count(&self) -> u64 {
        self.collaborator_unavailable.load(Ordering::Relaxed)
    }

    fn note_collaborator_unavailable(&self, what: &str) {
        self.collaborator_unavailable.fetch_add(1, Ordering::Relaxed);
        warn!(collaborator = what, "collaborator unavailable, degrading to empty results");
    }

    /// Parses and executes one input line against `session`. Never
    /// panics on malformed input: parse and validation failures are
    /// reported as `ERROR: <message>` and the session stays open.
    pub fn execute(&self, session: &mut Session, line: &str) -> ExecResult {
        let command = match parse_line(line) {
            Ok(c) => c,
            Err(e) => return ExecResult::text(format!("ERROR: {e}")),
        };

        if !self.auth.check_command(&session.id, verb_name(&command)) {
            return ExecResult::text("ERROR: command not permitted");
        }

        match self.dispatch(session, command) {
            Ok(result) => result,
            Err(e) => ExecResult::text(format!("ERROR: {e}")),
        }
    }

    fn dispatch(&self, session: &mut Session, command: Command) -> Result<ExecResult> {
        match command {
            Command::Set { target, expr } => {
                let value = {
                    let ctx = ExecCtx::new(&self.store, session);
                    expr.evaluate(&ctx)
                };
                match target {
                    AssignTarget::Local(name) => {
                        session.set_local(&name, value);
                        Ok(ExecResult::text("OK"))
                    }
                    AssignTarget::Global { global, path } => {
                        self.store_set(session, &global, &path, value)?;
                        Ok(ExecResult::mutation("OK"))
                    }
                }
            }
            Command::Get { global, path } => {
                let value = self.store_get(session, &global, &path)?;
                Ok(ExecResult::text(match value {
                    Some(v) if !v.is_null() => v.render_plain(),
                    _ => "NULL".to_string(),
                }))
            }
            Command::Kill { global, path } => {
                self.store_kill(session, &global, &path)?;
                Ok(ExecResult::mutation("OK"))
            }
            Command::Query { global, path, depth } => {
                if depth > self.max_query_depth {
                    return Err(err_kind(
                        Kind::Validation,
                        format!(
                            "query depth {depth} exceeds configured maximum {}",
                            self.max_query_depth
                        ),
                    ));
                }
                let results = match &session.transaction {
                    Some(tx) => tx.query(&global, &path, depth)?,
                    None => self.store.query(&global, &path, depth)?,
                };
                Ok(ExecResult::text(render_query_results(&global, &path, &results)))
            }
            Command::Write { exprs } => {
                let ctx = ExecCtx::new(&self.store, session);
                let text: String = exprs.iter().map(|e| e.evaluate(&ctx).render_plain()).collect();
                Ok(ExecResult::text(text))
            }
            Command::ZWrite(target) => Ok(ExecResult::text(self.zwrite(session, target))),
            Command::FastSearch(value_text) => {
                let value = Value::parse_bare_literal(&value_text);
                let results = self.store.fast_search(&value);
                Ok(ExecResult::text(render_search_results(&results)))
            }
            Command::ExactSearch { query, global } => {
                Ok(ExecResult::text(render_search_results(&self.exact_search(&query, global.as_deref()))))
            }
            Command::SimSearch { query, global, top_k } => {
                Ok(ExecResult::text(self.sim_search(&query, global.as_deref(), top_k)))
            }
            Command::BeginTransaction => {
                if session.transaction.is_some() {
                    return Err(err_kind(Kind::TransactionConflict, "a transaction is already in progress"));
                }
                session.transaction = Some(Transaction::begin(&self.store));
                Ok(ExecResult::mutation("TRANSACTION STARTED"))
            }
            Command::Commit => {
                let tx = session
                    .transaction
                    .take()
                    .ok_or_else(|| err_kind(Kind::TransactionConflict, "no transaction in progress"))?;
                tx.commit(&self.store);
                Ok(ExecResult::mutation("TRANSACTION COMMITTED"))
            }
            Command::Rollback => {
                let tx = session
                    .transaction
                    .take()
                    .ok_or_else(|| err_kind(Kind::TransactionConflict, "no transaction in progress"))?;
                tx.rollback();
                Ok(ExecResult::mutation("TRANSACTION ROLLED BACK"))
            }
            Command::Stats => {
                let stats = self.store.stats();
                Ok(ExecResult::text(render_stats(&stats, self.collaborator_unavailable_count())))
            }
            Command::Help => Ok(ExecResult::text(HELP_TEXT)),
            Command::Exit => Ok(ExecResult {
                output: "BYE".to_string(),
                should_exit: true,
                mutated: false,
            }),
            Command::Error(message) => Ok(ExecResult::text(format!("ERROR: {message}"))),
        }
    }

    fn store_set(&self, session: &mut Session, global: &str, path: &Path, value: Value) -> Result<()> {
        match &mut session.transaction {
            Some(tx) => tx.set(global, path, value),
            None => {
                self.store.set(global, path, value.clone())?;
                self.replicator.on_mutation(MutationKind::Set, global, path, Some(&value));
                debug!(global, path = %path, "replicated set");
                Ok(())
            }
        }
    }

    fn store_get(&self, session: &Session, global: &str, path: &Path) -> Result<Option<Value>> {
        match &session.transaction {
            Some(tx) => tx.get(global, path),
            None => self.store.get(global, path),
        }
    }

    fn store_kill(&self, session: &mut Session, global: &str, path: &Path) -> Result<()> {
        match &mut session.transaction {
            Some(tx) => tx.kill(global, path),
            None => {
                self.store.kill(global, path)?;
                self.replicator.on_mutation(MutationKind::Kill, global, path, None);
                Ok(())
            }
        }
    }

    /// Mirrors `Command::Query`'s transaction-vs-store branching so that
    /// ZWRITE issued inside an open transaction sees that transaction's
    /// own staged writes rather than pre-transaction store state.
    fn zwrite(&self, session: &Session, target: ZWriteTarget) -> String {
        let list_global_names = || match &session.transaction {
            Some(tx) => tx.list_global_names(),
            None => self.store.list_global_names(),
        };
        match target {
            ZWriteTarget::All => {
                let names = list_global_names();
                if names.is_empty() {
                    NO_RESULTS.to_string()
                } else {
                    names.join("\n")
                }
            }
            ZWriteTarget::Filter(filter) => {
                let filter_lower = filter.to_ascii_lowercase();
                let names: Vec<String> = list_global_names()
                    .into_iter()
                    .filter(|n| n.to_ascii_lowercase().contains(&filter_lower))
                    .collect();
                if names.is_empty() {
                    NO_RESULTS.to_string()
                } else {
                    names.join("\n")
                }
            }
            ZWriteTarget::Global { global, path } => {
                let results = match &session.transaction {
                    Some(tx) => tx.query(&global, &path, usize::MAX).unwrap_or_default(),
                    None => self.store.query(&global, &path, usize::MAX).unwrap_or_default(),
                };
                render_search_results(
                    &results
                        .into_iter()
                        .map(|(rel, v)| {
                            let mut full = path.elements().to_vec();
                            full.extend(rel.elements().iter().cloned());
                            (global.clone(), Path(full), v)
                        })
                        .collect::<Vec<_>>(),
                )
            }
        }
    }

    fn exact_search(&self, query: &str, global: Option<&str>) -> Vec<(String, Path, Value)> {
        let candidates = match global {
            Some(g) => vec![g.to_string()],
            None => self.store.list_global_names(),
        };
        let mut out = Vec::new();
        for g in candidates {
            for (path, value) in self.store.query(&g, &Path::root(), usize::MAX).unwrap_or_default() {
                if value.render_plain() == query {
                    out.push((g.clone(), path, value));
                }
            }
        }
        out
    }

    fn sim_search(&self, query: &str, global: Option<&str>, top_k: Option<usize>) -> String {
        let top_k = top_k.unwrap_or(self.default_topk);
        let query_vec = match self.embedder.embed(query) {
            Ok(v) => v,
            Err(_) => {
                self.note_collaborator_unavailable("embedder");
                return NO_RESULTS.to_string();
            }
        };

        let candidates = match global {
            Some(g) => vec![g.to_string()],
            None => self.store.list_global_names(),
        };
        let mut scored: Vec<(f32, String, Path, Value)> = Vec::new();
        for g in candidates {
            for (path, value) in self.store.query(&g, &Path::root(), usize::MAX).unwrap_or_default() {
                if value.is_null() {
                    continue;
                }
                let candidate_vec = match self.embedder.embed(&value.render_plain()) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                let score = self.embedder.similarity(&query_vec, &candidate_vec);
                if score >= self.similarity_threshold {
                    scored.push((score, g.clone(), path, value));
                }
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        render_search_results(
            &scored
                .into_iter()
                .map(|(_, g, p, v)| (g, p, v))
                .collect::<Vec<_>>(),
        )
    }
}

fn verb_name(command: &Command) -> &'static str {
    match command {
        Command::Set { .. } => "SET",
        Command::Get { .. } => "GET",
        Command::Kill { .. } => "KILL",
        Command::Query { .. } => "QUERY",
        Command::Write { .. } => "WRITE",
        Command::ZWrite(_) => "ZWRITE",
        Command::FastSearch(_) => "FSEARCH",
        Command::ExactSearch { .. } => "EXACTSEARCH",
        Command::SimSearch { .. } => "SIMSEARCH",
        Command::BeginTransaction => "TSTART",
        Command::Commit => "COMMIT",
        Command::Rollback => "ROLLBACK",
        Command::Stats => "STATS",
        Command::Help => "HELP",
        Command::Exit => "EXIT",
        Command::Error(_) => "ERROR",
    }
}
