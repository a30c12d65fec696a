// Ambient logging init. Called once from the `mumps` binary; every other
// crate just uses `tracing::{info,warn,error}` and assumes a subscriber is
// already installed, the same assumption `submerge_base::error::err` makes.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
