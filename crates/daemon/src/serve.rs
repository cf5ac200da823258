// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground daemon process: pid lock, supervisor, status file.

use crate::daemon::{Daemon, DaemonDeps};
use crate::error::DaemonError;
use crate::lifecycle::{DaemonPaths, PidLock};
use gv_adapters::{CliGit, GitAdapter, TracedGit};
use gv_core::{Config, HookBus, SystemClock};
use gv_engine::HandlerRegistry;
use std::future::Future;

/// Serve the repository at `config.root` with the system `git`.
pub async fn serve_repository(
    config: Config,
    shutdown: impl Future<Output = ()>,
    ready: impl FnOnce(),
) -> Result<(), DaemonError> {
    let git = TracedGit::new(CliGit::new(&config.root).with_timeout(config.git_timeout()));
    serve(config, git, shutdown, ready).await
}

/// Hold the pid lock, run the daemon until `shutdown` resolves, then drain.
///
/// `ready` is called once every worktree loop is running. The status file is
/// refreshed every poll interval and left behind in the `stopped` state.
pub async fn serve<G: GitAdapter>(
    config: Config,
    git: G,
    shutdown: impl Future<Output = ()>,
    ready: impl FnOnce(),
) -> Result<(), DaemonError> {
    let paths = DaemonPaths::for_root(&config.root);
    let lock = PidLock::acquire(&paths.pid)?;
    let interval = config.poll_interval();

    let deps = DaemonDeps {
        git,
        handlers: HandlerRegistry::new(),
        hooks: HookBus::with_tracing(),
    };
    let daemon = Daemon::new(config, deps, SystemClock);
    if let Err(e) = daemon.start().await {
        lock.release();
        return Err(e);
    }
    daemon.status().save(&paths.status)?;
    tracing::info!(pid = std::process::id(), "daemon ready");
    ready();

    let mut ticker = tokio::time::interval(interval);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = daemon.status().save(&paths.status) {
                    tracing::warn!(error = %e, "failed to write status file");
                }
            }
        }
    }

    tracing::info!("shutting down");
    let stopped = daemon.stop().await;
    let saved = daemon.status().save(&paths.status);
    lock.release();
    stopped?;
    saved
}

#[cfg(test)]
#[path = "serve_tests.rs"]
mod tests;
