use mumps_model::{Path, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationKind {
    Set,
    Kill,
}

/// Forwards a committed mutation to peer nodes. Calls must not block the
/// caller on network I/O; an implementation that needs to do real work
/// should hand off to its own background thread or channel.
pub trait Replicator: Send + Sync {
    fn on_mutation(&self, kind: MutationKind, global: &str, path: &Path, value: Option<&Value>);
}

/// Wired in by default: does nothing.
pub struct DisabledReplicator;

impl Replicator for DisabledReplicator {
    fn on_mutation(&self, _kind: MutationKind, _global: &str, _path: &Path, _value: Option<&Value>) {}
}
