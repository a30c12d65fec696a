// The append-only file journals every mutating command in its original
// command-syntax text -- the same surface grammar `mumps-proto::parse_line`
// already accepts -- so replay is just "read each line back and feed it
// through the parser and executor in order". SET, KILL, TSTART, COMMIT
// and ROLLBACK are all journal-worthy: a transaction's writes are only
// visible after COMMIT, so a replay session that processes the raw
// lines in order reconstructs the same committed/rolled-back history
// without needing any special-cased transaction framing of its own.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path as FsPath, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::error;

/// Counters surfaced through STATS; incremented only on the writer
/// thread, read from anywhere.
#[derive(Default)]
pub struct PersistenceMetrics {
    pub aof_errors: AtomicU64,
    pub last_snapshot_duration_ms: AtomicU64,
    pub last_snapshot_bytes: AtomicU64,
}

/// Handle to the background AOF writer. Dropping it (or calling
/// `shutdown`) closes the channel and joins the writer thread, which
/// flushes whatever it has buffered before exiting.
pub struct AofWriter {
    sender: SyncSender<String>,
    handle: Option<JoinHandle<()>>,
}

impl AofWriter {
    pub fn spawn(path: PathBuf, metrics: Arc<PersistenceMetrics>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (sender, receiver) = sync_channel::<String>(1024);
        let handle = std::thread::Builder::new()
            .name("mumps-aof-writer".to_string())
            .spawn(move || aof_writer_loop(file, receiver, metrics))
            .expect("failed to spawn AOF writer thread");
        Ok(AofWriter {
            sender,
            handle: Some(handle),
        })
    }

    /// Enqueues one command line for journaling. Never blocks the
    /// caller on disk I/O; a full channel applies backpressure instead
    /// of silently dropping records.
    pub fn record(&self, line: &str) {
        let _ = self.sender.send(line.to_string());
    }

    /// Drains the channel and joins the writer thread, bounded so
    /// shutdown can't hang indefinitely on a stuck disk.
    pub fn shutdown(mut self, timeout: Duration) {
        // Dropping the sender first is what unblocks the writer loop's
        // `recv_timeout` with `Disconnected`; joining before that would
        // risk waiting out the full timeout for nothing.
        let handle = self.handle.take();
        drop(self);
        if let Some(handle) = handle {
            let _ = join_with_timeout(handle, timeout);
        }
    }
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> std::thread::Result<()> {
    // std::thread has no built-in join-with-timeout; the channel close
    // already unblocks the loop quickly, so a short sleep-then-join is
    // enough without pulling in another dependency for this one spot.
    let start = std::time::Instant::now();
    while !handle.is_finished() && start.elapsed() < timeout {
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.join()
}

fn aof_writer_loop(file: File, receiver: Receiver<String>, metrics: Arc<PersistenceMetrics>) {
    let mut writer = BufWriter::new(file);
    loop {
        match receiver.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => {
                if let Err(e) = writeln!(writer, "{line}") {
                    metrics.aof_errors.fetch_add(1, Ordering::Relaxed);
                    error!(error = %e, "AOF write failed");
                }
                // Drain whatever else is immediately available before
                // paying for a flush.
                while let Ok(more) = receiver.try_recv() {
                    if let Err(e) = writeln!(writer, "{more}") {
                        metrics.aof_errors.fetch_add(1, Ordering::Relaxed);
                        error!(error = %e, "AOF write failed");
                    }
                }
                if let Err(e) = writer.flush() {
                    metrics.aof_errors.fetch_add(1, Ordering::Relaxed);
                    error!(error = %e, "AOF flush failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                let _ = writer.flush();
                return;
            }
        }
    }
}

/// Reads every line of the AOF file in order. A missing file means
/// "nothing to replay yet", not an error.
pub fn read_aof_lines(path: &FsPath) -> std::io::Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    reader.lines().collect()
}
