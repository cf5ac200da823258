// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the job runner

use gv_core::{ErrorKind, Fingerprint, JobId};
use gv_storage::ReceiptError;
use thiserror::Error;

/// Errors surfaced by [`crate::Runner`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Another run holds the lock for this (worktree, job, fingerprint).
    #[error("{job_id} is already running for {fingerprint}")]
    AlreadyRunning {
        job_id: JobId,
        fingerprint: Fingerprint,
    },

    #[error("{job_id} timed out after {after_ms}ms")]
    Timeout {
        job_id: JobId,
        after_ms: u64,
        /// The grace period also elapsed and the run was dropped.
        hard: bool,
    },

    #[error("{job_id} failed: {message}")]
    User { job_id: JobId, message: String },

    #[error("cannot set up context for {job_id}: {message}")]
    ContextSetup { job_id: JobId, message: String },

    #[error(transparent)]
    Receipt(#[from] ReceiptError),
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::AlreadyRunning { .. } => ErrorKind::LockUnavailable,
            RunnerError::Timeout { .. } => ErrorKind::Timeout,
            RunnerError::User { .. } => ErrorKind::User,
            RunnerError::ContextSetup { .. } => ErrorKind::Filesystem,
            RunnerError::Receipt(e) => e.kind(),
        }
    }
}
