// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A coarse classification so callers at the session boundary (mumps-server) can decide
//    whether to keep the connection open, degrade a result, or exit the process, without
//    string-matching the message.

use std::borrow::Cow;
use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Coarse error classification, per the error handling design: kinds 1-5 are
/// recoverable at the session boundary, kind 6 is asynchronous-only, kind 7
/// is the only one that should ever propagate to process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Parse,
    Validation,
    TransactionConflict,
    CollaboratorUnavailable,
    Io,
    Fatal,
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error {
    kind: Kind,
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}
impl std::error::Error for Error {}

// Any io/serde/etc error that crosses into our code via `?` is treated as an
// I/O failure by default: the one place that needs a different kind (parse,
// validation, transaction conflict, collaborator-unavailable, fatal) always
// goes through `err_kind` explicitly instead of relying on `?`.
impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(Kind::Io, err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: Kind, err: E) -> Error {
        error!(target: "mumps", kind = ?kind, "{:?}", err);
        let inner = DynBacktraceError::from(err);
        Error { kind, inner }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    err_kind(Kind::Validation, msg)
}

pub fn err_kind(kind: Kind, msg: impl Into<Cow<'static, str>>) -> Error {
    let simple = SimpleErr(msg.into());
    Error::new(kind, simple)
}

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.kind(), Kind::Validation);
}

#[test]
fn test_error_kind_round_trip() {
    let e = err_kind(Kind::Parse, "bad token");
    assert_eq!(e.kind(), Kind::Parse);
    assert_eq!(format!("{}", e).contains("bad token"), true);
}
