// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then `<root>/gitvan.toml`, then
//! `GITVAN_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default notes ref for receipts.
pub const DEFAULT_NOTES_REF: &str = "refs/notes/gitvan/results";

/// Name of the optional config file at the repository root.
pub const CONFIG_FILE: &str = "gitvan.toml";

/// Directory (under the root) holding state, logs and snapshots.
pub const GITVAN_DIR: &str = ".gitvan";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("cannot determine working directory: {0}")]
    NoRoot(std::io::Error),
}

impl ConfigError {
    pub fn kind(&self) -> crate::ErrorKind {
        match self {
            ConfigError::Io { .. } | ConfigError::NoRoot(_) => crate::ErrorKind::Filesystem,
            ConfigError::Parse { .. } | ConfigError::InvalidEnv { .. } => {
                crate::ErrorKind::Validation
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Repository root; not read from the file.
    #[serde(skip)]
    pub root: PathBuf,
    pub jobs_dirs: Vec<PathBuf>,
    pub events_dirs: Vec<PathBuf>,
    pub notes_ref: String,
    pub max_parallel: usize,
    pub worktree_parallel: usize,
    pub poll_interval_ms: u64,
    pub drain_deadline_ms: u64,
    pub job_timeout_ms: u64,
    pub grace_ms: u64,
    pub git_timeout_ms: u64,
    pub snapshot_retention_days: u64,
    pub cron_replay_limit_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            jobs_dirs: vec![PathBuf::from("jobs")],
            events_dirs: vec![PathBuf::from("events")],
            notes_ref: DEFAULT_NOTES_REF.to_string(),
            max_parallel: cpu_count(),
            worktree_parallel: 4,
            poll_interval_ms: 2_000,
            drain_deadline_ms: 30_000,
            job_timeout_ms: 600_000,
            grace_ms: 10_000,
            git_timeout_ms: 30_000,
            snapshot_retention_days: 30,
            cron_replay_limit_minutes: 1_440,
        }
    }
}

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Defaults rooted at `root`, without reading the file or environment.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load config for the root named by `GITVAN_ROOT_DIR` (or the cwd).
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::load(&resolve_root()?)
    }

    /// Load `<root>/gitvan.toml` if present and apply environment overrides.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<Config>(&text)
                .map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        config.root = root.to_path_buf();
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `GITVAN_*` overrides from `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("GITVAN_NOTES_REF").filter(|v| !v.is_empty()) {
            self.notes_ref = v;
        }
        if let Some(v) = lookup("GITVAN_MAX_PARALLEL") {
            self.max_parallel = parse_env("GITVAN_MAX_PARALLEL", &v)?;
            if self.max_parallel == 0 {
                return Err(ConfigError::InvalidEnv {
                    var: "GITVAN_MAX_PARALLEL",
                    value: v,
                });
            }
        }
        if let Some(v) = lookup("GITVAN_POLL_MS") {
            self.poll_interval_ms = parse_env("GITVAN_POLL_MS", &v)?;
        }
        if let Some(v) = lookup("GITVAN_GIT_TIMEOUT_MS") {
            self.git_timeout_ms = parse_env("GITVAN_GIT_TIMEOUT_MS", &v)?;
        }
        Ok(())
    }

    pub fn gitvan_dir(&self) -> PathBuf {
        self.root.join(GITVAN_DIR)
    }

    pub fn state_dir(&self) -> PathBuf {
        state_dir_for(&self.root)
    }

    pub fn logs_dir(&self) -> PathBuf {
        logs_dir_for(&self.root)
    }

    /// Absolute job roots.
    pub fn jobs_roots(&self) -> Vec<PathBuf> {
        self.jobs_dirs.iter().map(|d| self.root.join(d)).collect()
    }

    /// Absolute event roots.
    pub fn events_roots(&self) -> Vec<PathBuf> {
        self.events_dirs.iter().map(|d| self.root.join(d)).collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_deadline(&self) -> Duration {
        Duration::from_millis(self.drain_deadline_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_millis(self.git_timeout_ms)
    }

    pub fn snapshot_retention(&self) -> Duration {
        Duration::from_secs(self.snapshot_retention_days * 86_400)
    }
}

/// `<worktree>/.gitvan/state`
pub fn state_dir_for(worktree: &Path) -> PathBuf {
    worktree.join(GITVAN_DIR).join("state")
}

/// `<worktree>/.gitvan/logs`
pub fn logs_dir_for(worktree: &Path) -> PathBuf {
    worktree.join(GITVAN_DIR).join("logs")
}

/// Root directory: `GITVAN_ROOT_DIR` if set, else the current directory.
pub fn resolve_root() -> Result<PathBuf, ConfigError> {
    match std::env::var("GITVAN_ROOT_DIR") {
        Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().map_err(ConfigError::NoRoot),
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
