// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-job activity log.
//!
//! Writes human-readable timestamped lines to `<logs_dir>/jobs/<job_id>.log`.
//! Each append opens, writes, and closes the file. Failures are reported
//! through tracing and never reach the caller.

use crate::log_paths;
use gv_core::format_iso8601;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JobLogger {
    log_dir: PathBuf,
}

impl JobLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Format: `2026-03-01T02:00:00.000Z [label] message`
    pub fn append(&self, job_id: &str, label: &str, message: &str) {
        let path = log_paths::job_log_path(&self.log_dir, job_id);
        if let Err(e) = write_line(&path, label, message) {
            tracing::warn!(job_id, error = %e, "failed to write job log");
        }
    }

    /// Append multi-line output between fence lines.
    pub fn append_fenced(&self, job_id: &str, label: &str, content: &str) {
        if content.is_empty() {
            return;
        }
        let path = log_paths::job_log_path(&self.log_dir, job_id);
        let result = (|| -> std::io::Result<()> {
            let mut file = open(&path)?;
            writeln!(file, "{} [{}] ```", now(), label)?;
            write!(file, "{}", content)?;
            if !content.ends_with('\n') {
                writeln!(file)?;
            }
            writeln!(file, "{} [{}] ```", now(), label)
        })();
        if let Err(e) = result {
            tracing::warn!(job_id, error = %e, "failed to write job log");
        }
    }
}

fn now() -> String {
    format_iso8601(chrono::Utc::now())
}

fn open(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_line(path: &Path, label: &str, message: &str) -> std::io::Result<()> {
    let mut file = open(path)?;
    writeln!(file, "{} [{}] {}", now(), label, message)
}

#[cfg(test)]
#[path = "activity_logger_tests.rs"]
mod tests;
