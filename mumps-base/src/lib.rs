mod config;
mod error;
mod logging;

pub use config::Config;
pub use error::{err, err_kind, Error, Kind, Result};
pub use logging::init_tracing;
