// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pack errors

use crate::version::VersionError;
use gv_core::{ErrorKind, PackId};
use gv_storage::{PersistError, SnapshotError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("{location}: {message}")]
    Invalid { location: String, message: String },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("{}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no version of {id} satisfies {constraint}")]
    Unresolved { id: String, constraint: String },

    #[error("circular dependency: {}", cycle.join(" -> "))]
    Circular { cycle: Vec<String> },

    #[error("{id} resolved to {resolved} but {required_by} requires {constraint}")]
    VersionConflict {
        id: String,
        resolved: String,
        constraint: String,
        required_by: String,
    },

    #[error("pack {pack_id} requires option {name:?}")]
    MissingOption { pack_id: PackId, name: String },

    #[error("pack {pack_id} transform {index} ({path}) failed: {message}")]
    Transform {
        pack_id: PackId,
        index: usize,
        path: String,
        message: String,
        /// Rollback steps of the aborted batch that also failed.
        rollback_failures: usize,
    },

    #[error("pack {0} is not installed")]
    NotInstalled(PackId),

    #[error("rollback of pack {pack_id} left {failed} step(s) unrestored")]
    RollbackIncomplete { pack_id: PackId, failed: usize },

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl PackError {
    pub(crate) fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        PackError::Invalid {
            location: location.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::Invalid { .. }
            | PackError::Version(_)
            | PackError::Parse { .. }
            | PackError::MissingOption { .. } => ErrorKind::Validation,
            PackError::Unresolved { .. }
            | PackError::Circular { .. }
            | PackError::VersionConflict { .. } => ErrorKind::Dependency,
            PackError::NotInstalled(_) => ErrorKind::User,
            PackError::Io { .. }
            | PackError::Transform { .. }
            | PackError::RollbackIncomplete { .. } => ErrorKind::Filesystem,
            PackError::Persist(e) => e.kind(),
            PackError::Snapshot(e) => e.kind(),
        }
    }
}
