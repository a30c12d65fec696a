// One `std::thread` per accepted connection, plus a dedicated AOF writer
// thread and a periodic snapshot thread parked on a timed sleep loop --
// the same "a background thread per concern, coordinated through a
// shared `Arc`/`AtomicBool` rather than an async runtime" shape used
// throughout the corpus for this kind of socket-per-thread service.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use mumps_base::Config;
use mumps_collab::{Auth, DisabledAuth, DisabledEmbedder, DisabledReplicator, Embedder, Replicator};
use mumps_exec::{ExecResult, Executor, Session, HELP_TEXT, WELCOME_BANNER};
use mumps_persist::{read_aof_lines, read_snapshot, write_snapshot, AofWriter, PersistenceMetrics};
use mumps_proto::parse_line;
use mumps_store::GlobalStore;

const PROMPT: &str = "> ";

pub struct SessionServer {
    store: Arc<GlobalStore>,
    executor: Arc<Executor>,
    aof: AofWriter,
    metrics: Arc<PersistenceMetrics>,
    shutdown: Arc<AtomicBool>,
    next_session_id: AtomicU64,
    snapshot_path: PathBuf,
    snapshot_interval: Duration,
}

impl SessionServer {
    /// Loads the snapshot and replays the AOF on top of it, then wires
    /// up an executor with the no-op collaborators (a real `Auth`,
    /// `Embedder`, or `Replicator` is supplied by whoever embeds this
    /// crate, not decided here).
    pub fn start(config: &Config) -> mumps_base::Result<Self> {
        Self::start_with_collaborators(
            config,
            Arc::new(DisabledAuth),
            Arc::new(DisabledEmbedder),
            Arc::new(DisabledReplicator),
        )
    }

    pub fn start_with_collaborators(
        config: &Config,
        auth: Arc<dyn Auth>,
        embedder: Arc<dyn Embedder>,
        replicator: Arc<dyn Replicator>,
    ) -> mumps_base::Result<Self> {
        let cache_cap = config.get_u64("cache.max.size")? as usize;
        let store = Arc::new(GlobalStore::new(cache_cap));

        let snapshot_path = PathBuf::from(
            config
                .get_str("persistence.snapshot.file")
                .unwrap_or("database.snapshot"),
        );
        let aof_path = PathBuf::from(
            config
                .get_str("persistence.aof.file")
                .unwrap_or("commands.aof"),
        );

        if let Some(globals) = read_snapshot(&snapshot_path)? {
            store.replace_all(globals);
            info!(path = %snapshot_path.display(), "loaded snapshot");
        }

        let default_topk = config.get_u64("rag.search.default.topk")? as usize;
        let similarity_threshold = config.get_f64("rag.similarity.threshold")? as f32;
        let max_query_depth = config.get_u64("query.max.depth")? as usize;

        // The embedder is only actually wired in when the config flag
        // allows it; with auto-embedding disabled, SIMSEARCH degrades to
        // empty results the same way it does when no embedder was ever
        // supplied at all.
        let embedder: Arc<dyn Embedder> = if config.get_bool("database.auto.embedding.enabled")? {
            embedder
        } else {
            Arc::new(DisabledEmbedder)
        };

        let executor = Arc::new(Executor::new(
            Arc::clone(&store),
            auth,
            embedder,
            replicator,
            default_topk,
            similarity_threshold,
            max_query_depth,
        ));

        replay_aof(&aof_path, &executor);

        let metrics = Arc::new(PersistenceMetrics::default());
        let aof = AofWriter::spawn(aof_path, Arc::clone(&metrics))
            .map_err(|e| mumps_base::err_kind(mumps_base::Kind::Io, e.to_string()))?;

        let snapshot_interval =
            Duration::from_secs(config.get_u64("persistence.auto.save.interval")?);

        Ok(SessionServer {
            store,
            executor,
            aof,
            metrics,
            shutdown: Arc::new(AtomicBool::new(false)),
            next_session_id: AtomicU64::new(1),
            snapshot_path,
            snapshot_interval,
        })
    }

    pub fn metrics(&self) -> &Arc<PersistenceMetrics> {
        &self.metrics
    }

    /// Persistence counters appended as sibling fields to STATS' own
    /// store-level numbers -- the ambient metrics surface that Non-goals
    /// never scope out.
    fn persistence_stats_text(&self) -> String {
        [
            format!("aofErrors={}", self.metrics.aof_errors.load(Ordering::Relaxed)),
            format!(
                "lastSnapshotDurationMs={}",
                self.metrics.last_snapshot_duration_ms.load(Ordering::Relaxed)
            ),
            format!(
                "lastSnapshotBytes={}",
                self.metrics.last_snapshot_bytes.load(Ordering::Relaxed)
            ),
        ]
        .join("\n")
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Writes a fresh snapshot of the live store to `snapshot_path`,
    /// recording duration and size into the shared metrics.
    pub fn snapshot_now(&self) -> mumps_base::Result<()> {
        let globals = self.store.snapshot_map();
        let stats = write_snapshot(&self.snapshot_path, &globals)?;
        self.metrics
            .last_snapshot_duration_ms
            .store(stats.duration.as_millis() as u64, Ordering::Relaxed);
        self.metrics
            .last_snapshot_bytes
            .store(stats.byte_size, Ordering::Relaxed);
        Ok(())
    }

    /// Runs the periodic snapshot loop on the calling thread until
    /// shutdown is requested, then takes one final snapshot before
    /// returning.
    pub fn run_snapshot_loop(&self) {
        while !self.is_shutting_down() {
            std::thread::sleep(self.snapshot_interval);
            if self.is_shutting_down() {
                break;
            }
            if let Err(e) = self.snapshot_now() {
                error!(error = %e, "periodic snapshot failed");
            }
        }
        if let Err(e) = self.snapshot_now() {
            error!(error = %e, "final shutdown snapshot failed");
        }
    }

    /// Binds `addr` and accepts connections, spawning one thread per
    /// connection, until shutdown is requested.
    pub fn run_socket(self: Arc<Self>, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!(addr, "listening");
        while !self.is_shutting_down() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&self);
                    let session_id = server.next_session_id.fetch_add(1, Ordering::Relaxed);
                    std::thread::Builder::new()
                        .name(format!("mumps-conn-{session_id}"))
                        .spawn(move || server.handle_stream(stream, session_id.to_string()))
                        .map(|_| ())
                        .unwrap_or_else(|e| error!(error = %e, peer = %peer, "failed to spawn connection thread"));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
        Ok(())
    }

    fn handle_stream(&self, stream: TcpStream, session_id: String) {
        let mut writer = match stream.try_clone() {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "failed to clone connection stream");
                return;
            }
        };
        let reader = BufReader::new(stream);
        let _ = writeln!(writer, "{WELCOME_BANNER}");
        let _ = writeln!(writer, "{HELP_TEXT}");
        let _ = write!(writer, "{PROMPT}");
        let _ = writer.flush();
        self.run_session(session_id, reader.lines().map_while(Result::ok), |line| {
            let _ = writeln!(writer, "{line}");
            let _ = write!(writer, "{PROMPT}");
            let _ = writer.flush();
        });
    }

    /// Console mode: the same executor and parser, driven off stdin and
    /// stdout instead of a socket, for a single local session.
    pub fn run_console(&self) {
        println!("{WELCOME_BANNER}");
        println!("{HELP_TEXT}");
        print!("{PROMPT}");
        let _ = std::io::stdout().flush();
        let stdin = std::io::stdin();
        self.run_session(
            "console".to_string(),
            stdin.lock().lines().map_while(Result::ok),
            |line| {
                println!("{line}");
                print!("{PROMPT}");
                let _ = std::io::stdout().flush();
            },
        );
    }

    fn run_session(
        &self,
        session_id: String,
        lines: impl Iterator<Item = String>,
        mut respond: impl FnMut(&str),
    ) {
        let mut session = Session::new(session_id);
        for line in lines {
            if self.is_shutting_down() {
                respond("ERROR: server is shutting down");
                break;
            }
            if line.trim().is_empty() {
                respond("");
                continue;
            }
            let ExecResult {
                mut output,
                should_exit,
                mutated,
            } = self.executor.execute(&mut session, &line);
            if mutated {
                self.aof.record(&line);
            }
            if is_stats_command(&line) {
                output.push('\n');
                output.push_str(&self.persistence_stats_text());
            }
            respond(&output);
            if should_exit {
                break;
            }
        }
    }
}

fn is_stats_command(line: &str) -> bool {
    let verb = line.trim().split_whitespace().next().unwrap_or("");
    verb.eq_ignore_ascii_case("stats") || verb.eq_ignore_ascii_case("$s")
}

/// Feeds every journaled line back through the parser and executor, in
/// order, against a throwaway session. Parse errors on individual lines
/// are logged and skipped rather than aborting the replay -- a crash
/// mid-write can leave a trailing partial line.
fn replay_aof(aof_path: &std::path::Path, executor: &Executor) {
    let lines = match read_aof_lines(aof_path) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, "could not read AOF for replay");
            return;
        }
    };
    if lines.is_empty() {
        return;
    }
    info!(count = lines.len(), "replaying AOF");
    let mut session = Session::new("replay");
    for line in lines {
        if parse_line(&line).is_err() {
            warn!(line = %line, "skipping unparseable AOF line during replay");
            continue;
        }
        executor.execute(&mut session, &line);
    }
}
