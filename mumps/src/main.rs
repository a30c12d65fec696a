use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use mumps_base::Config;
use mumps_server::SessionServer;

/// In-memory hierarchical key/value database with a MUMPS-like command language.
#[derive(Parser, Debug)]
#[command(name = "mumps", version, about)]
struct Cli {
    /// Start the socket listener only.
    #[arg(short, long)]
    socket: bool,

    /// Start an interactive REPL on stdin/stdout only.
    #[arg(short, long)]
    console: bool,

    /// Start both the socket listener and the console REPL (default when no mode flag is given).
    #[arg(short, long)]
    both: bool,

    /// Path to a flat `key.path = value` config file, applied over the built-in defaults.
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    mumps_base::init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, path, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => Config::defaults(),
    };

    let (run_socket, run_console) = match (cli.socket, cli.console, cli.both) {
        (false, false, false) => (true, true),
        (s, c, b) => (s || b, c || b),
    };

    let server = match SessionServer::start(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let ctrlc_server = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        ctrlc_server.request_shutdown();
    }) {
        error!(error = %e, "failed to install Ctrl-C handler");
    }

    let snapshot_server = Arc::clone(&server);
    let snapshot_thread = std::thread::spawn(move || snapshot_server.run_snapshot_loop());

    let socket_thread = if run_socket {
        let socket_server = Arc::clone(&server);
        let port = config.get_u64("server.port").unwrap_or(9090);
        let addr = format!("0.0.0.0:{port}");
        Some(std::thread::spawn(move || {
            if let Err(e) = socket_server.run_socket(&addr) {
                error!(error = %e, "socket listener failed");
            }
        }))
    } else {
        None
    };

    if run_console {
        server.run_console();
        server.request_shutdown();
    }

    if let Some(handle) = socket_thread {
        let _ = handle.join();
    }
    let _ = snapshot_thread.join();

    info!("shutdown complete");
    ExitCode::SUCCESS
}
