// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for starting, stopping, and probing the `gitvand` process that
//! serves one repository root.

use crate::exit_error::ExitError;
use gv_daemon::logging::parse_startup_error;
use gv_daemon::{read_pid, DaemonPaths};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Line `gitvand` prints on stdout once its worktree loops are running.
const READY_LINE: &str = "READY";

/// Pid of a live daemon for this root, if any.
pub fn running_pid(paths: &DaemonPaths) -> Option<u32> {
    read_pid(&paths.pid).filter(|pid| process_exists(*pid))
}

/// Spawn `gitvand` for `root` and wait until it reports ready.
///
/// Fails with the daemon's own startup error when it exits early.
pub fn start_daemon_background(
    root: &Path,
    paths: &DaemonPaths,
    timeout: Duration,
) -> Result<u32, ExitError> {
    let binary = find_gitvand_binary();
    let mut child = Command::new(&binary)
        .env("GITVAN_ROOT_DIR", root)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            ExitError::new(2, format!("cannot spawn {}: {}", binary.display(), e))
        })?;
    let pid = child.id();

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if line.trim() == READY_LINE {
                    let _ = tx.send(());
                    break;
                }
            }
        });
    }

    let start = Instant::now();
    while start.elapsed() < timeout {
        if rx.try_recv().is_ok() {
            return Ok(pid);
        }
        if let Ok(Some(status)) = child.try_wait() {
            let message = read_startup_error(paths)
                .unwrap_or_else(|| format!("daemon exited with {}", status));
            let code = status.code().filter(|c| (1..=3).contains(c)).unwrap_or(2);
            return Err(ExitError::new(code, message));
        }
        std::thread::sleep(crate::env::poll_interval());
    }
    Err(ExitError::new(
        2,
        format!("daemon (pid {}) did not report ready within {:?}", pid, timeout),
    ))
}

/// SIGTERM the daemon and wait for it to drain; SIGKILL past `timeout`.
///
/// Returns `false` when no daemon was running.
pub async fn stop_daemon(paths: &DaemonPaths, timeout: Duration) -> bool {
    let Some(pid) = running_pid(paths) else {
        cleanup_stale_pid(paths);
        return false;
    };

    kill_signal("-15", pid);
    if !wait_for_exit(pid, timeout).await {
        tracing::warn!(pid, "daemon ignored SIGTERM, killing");
        force_kill_daemon(pid);
        wait_for_exit(pid, Duration::from_secs(2)).await;
    }
    cleanup_stale_pid(paths);
    true
}

/// Wait for a process to exit
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(crate::env::poll_interval()).await;
    }
    !process_exists(pid)
}

/// Find the gitvand binary
fn find_gitvand_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();

    // Prefer the workspace build when the CLI itself is a debug build
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .is_some_and(|s| s.contains("target/debug"));
    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/gitvand"));
            if let Some(path) = dev_path.filter(|p| p.exists()) {
                return path;
            }
        }
    }

    if let Some(dir) = current_exe.as_ref().and_then(|exe| exe.parent()) {
        let sibling = dir.join("gitvand");
        if sibling.exists() {
            return sibling;
        }
    }

    PathBuf::from("gitvand")
}

/// Remove a pid file whose process is gone.
fn cleanup_stale_pid(paths: &DaemonPaths) {
    if let Some(pid) = read_pid(&paths.pid) {
        if !process_exists(pid) {
            let _ = std::fs::remove_file(&paths.pid);
        }
    }
}

/// Execute kill command with the given signal and PID
fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Startup error from the latest attempt in the daemon log.
pub fn read_startup_error(paths: &DaemonPaths) -> Option<String> {
    let content = std::fs::read_to_string(&paths.log).ok()?;
    parse_startup_error(&content)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
