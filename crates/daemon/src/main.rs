// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitVan daemon (gitvand)
//!
//! Watches every worktree of the repository at `GITVAN_ROOT_DIR` (or the
//! current directory) and runs matching jobs until SIGTERM or SIGINT.

use gv_core::Config;
use gv_daemon::logging::{
    rotate_log_if_needed, setup_logging, write_startup_error, write_startup_marker,
};
use gv_daemon::{serve_repository, DaemonError, DaemonPaths};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

fn usage() {
    println!("gitvand {}", env!("CARGO_PKG_VERSION"));
    println!("GitVan daemon - polls worktrees and runs matching jobs");
    println!();
    println!("USAGE:");
    println!("    gitvand");
    println!();
    println!("The daemon is typically started by `gitvan daemon start`.");
    println!("It serves the repository at GITVAN_ROOT_DIR (default: cwd).");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("gitvand {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                usage();
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: gitvand [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = run().await {
        eprintln!("gitvand: {e}");
        std::process::exit(e.kind().exit_code());
    }
}

async fn run() -> Result<(), DaemonError> {
    let config = Config::load_from_env()?;
    let paths = DaemonPaths::for_root(&config.root);

    rotate_log_if_needed(&paths.log);
    write_startup_marker(&paths.log)?;
    let log_guard = setup_logging(&paths.log)?;
    info!(root = %config.root.display(), "starting daemon");

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| DaemonError::io("SIGTERM", e))?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| DaemonError::io("SIGINT", e))?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, draining"),
            _ = sigint.recv() => info!("received SIGINT, draining"),
        }
    };

    // Signal ready for the parent process (the CLI waits for this line)
    let result = serve_repository(config, shutdown, || println!("READY")).await;
    match &result {
        Ok(()) => info!("daemon stopped"),
        Err(e) => {
            write_startup_error(&paths.log, e);
            error!(error = %e, "daemon failed");
        }
    }
    drop(log_guard);
    result
}
