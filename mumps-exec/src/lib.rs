#![allow(dead_code)]

mod context;
mod executor;
mod format;
mod session;

pub use context::ExecCtx;
pub use executor::{ExecResult, Executor};
pub use format::{HELP_TEXT, WELCOME_BANNER};
pub use session::Session;
