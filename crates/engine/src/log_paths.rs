// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared path builders for log files under `<worktree>/.gitvan/logs`.
//!
//!   `<logs_dir>/jobs/<job_id>.log`
//!   `<logs_dir>/daemon.log`

use std::path::{Path, PathBuf};

/// Structure: `{logs_dir}/jobs/{job_id}.log`
///
/// Characters outside `[A-Za-z0-9._-]` in the id become `_`.
pub fn job_log_path(logs_dir: &Path, job_id: &str) -> PathBuf {
    let name: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    logs_dir.join("jobs").join(format!("{}.log", name))
}

pub fn daemon_log_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join("daemon.log")
}

#[cfg(test)]
#[path = "log_paths_tests.rs"]
mod tests;
