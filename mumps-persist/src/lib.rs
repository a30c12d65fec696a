#![allow(dead_code)]

mod aof;
mod snapshot;

pub use aof::{read_aof_lines, AofWriter, PersistenceMetrics};
pub use snapshot::{read_snapshot, write_snapshot, SnapshotStats};
