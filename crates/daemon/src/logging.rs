// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file: rotation, startup marker, subscriber setup.

use crate::error::DaemonError;
use crate::lifecycle::STARTUP_MARKER_PREFIX;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotate once the log grows past this many bytes.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated files kept (`daemon.log.1` is the newest).
const MAX_ROTATED: u32 = 3;

fn rotated(path: &Path, n: u32) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}", n));
    path.with_file_name(name)
}

/// Shift `log.1..log.N` up by one and move an oversized `log` to `log.1`.
pub fn rotate_log_if_needed(path: &Path) {
    let Ok(meta) = std::fs::metadata(path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }
    let _ = std::fs::remove_file(rotated(path, MAX_ROTATED));
    for n in (1..MAX_ROTATED).rev() {
        let from = rotated(path, n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(path, n + 1));
        }
    }
    let _ = std::fs::rename(path, rotated(path, 1));
}

fn append(path: &Path) -> Result<std::fs::File, DaemonError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DaemonError::io(parent, e))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DaemonError::io(path, e))
}

/// Append `--- gitvand: starting (pid: N)` so readers can find this attempt.
pub fn write_startup_marker(path: &Path) -> Result<(), DaemonError> {
    let mut file = append(path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())
        .map_err(|e| DaemonError::io(path, e))
}

/// Write a startup failure synchronously; the non-blocking writer may not flush.
pub fn write_startup_error(path: &Path, error: &dyn Display) {
    if let Ok(mut file) = append(path) {
        let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
    }
}

/// Startup errors logged after the last startup marker.
pub fn parse_startup_error(content: &str) -> Option<String> {
    let start = content.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<&str> = content[start..]
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.starts_with("ERROR "))
        .map(|line| line.split_once(": ").map(|(_, msg)| msg).unwrap_or(line))
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Install a file subscriber filtered by `GITVAN_LOG` (default `info`).
pub fn setup_logging(
    path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (dir, file) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(file)) => (dir, file),
        _ => {
            return Err(DaemonError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
            ))
        }
    };
    std::fs::create_dir_all(dir).map_err(|e| DaemonError::io(dir, e))?;

    let appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_new(crate::env::log_filter("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
