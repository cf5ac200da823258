// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level daemon files: pid lock, status snapshot, log location

use crate::error::DaemonError;
use crate::state::DaemonState;
use fs2::FileExt;
use gv_core::config::{logs_dir_for, state_dir_for};
use gv_storage::{load_json, save_json};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Startup marker written to the log before anything else.
pub const STARTUP_MARKER_PREFIX: &str = "--- gitvand: starting (pid: ";

/// Where the daemon keeps its process files for a repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    pub pid: PathBuf,
    pub status: PathBuf,
    pub log: PathBuf,
}

impl DaemonPaths {
    pub fn for_root(root: &Path) -> Self {
        let state = state_dir_for(root);
        Self {
            pid: state.join("daemon.pid"),
            status: state.join("daemon.json"),
            log: gv_engine::log_paths::daemon_log_path(&logs_dir_for(root)),
        }
    }
}

/// Exclusive advisory lock on the pid file, held for the daemon's lifetime.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    // NOTE(lifetime): held to keep the exclusive lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DaemonError::io(parent, e))?;
        }
        // Open without truncating so a running daemon's pid survives a failed attempt
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| DaemonError::io(path, e))?;
        if file.try_lock_exclusive().is_err() {
            return Err(DaemonError::LockFailed {
                path: path.to_path_buf(),
                pid: read_pid(path),
            });
        }
        file.set_len(0).map_err(|e| DaemonError::io(path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| DaemonError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the pid file; the lock itself goes with the handle.
    pub fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove pid file");
        }
    }
}

/// Pid recorded in a pid file, if readable.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Per-worktree counters reported by `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeStatus {
    pub path: PathBuf,
    pub polls: u64,
    pub events: u64,
    pub cron_ticks: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_poll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Snapshot of the daemon written to `daemon.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatus {
    pub pid: u32,
    pub state: DaemonState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default)]
    pub worktrees: Vec<WorktreeStatus>,
    pub updated_at: String,
}

impl DaemonStatus {
    pub fn load(path: &Path) -> Result<Option<Self>, DaemonError> {
        Ok(load_json(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DaemonError> {
        Ok(save_json(path, self)?)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
