// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon errors

use crate::state::DaemonState;
use gv_adapters::GitError;
use gv_core::{ConfigError, ErrorKind};
use gv_storage::PersistError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another daemon holds the pid lock.
    #[error("daemon already running{}", pid.map(|p| format!(" (pid {})", p)).unwrap_or_default())]
    LockFailed { path: PathBuf, pid: Option<u32> },

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: DaemonState,
        action: &'static str,
    },
}

impl DaemonError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DaemonError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::Config(e) => e.kind(),
            DaemonError::InvalidTransition { .. } => ErrorKind::User,
            DaemonError::Git(e) => e.kind(),
            DaemonError::Persist(e) => e.kind(),
            DaemonError::Io { .. } => ErrorKind::Filesystem,
            DaemonError::LockFailed { .. } => ErrorKind::LockUnavailable,
        }
    }
}
