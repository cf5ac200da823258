// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors that carry a process exit code.

use gv_core::ErrorKind;
use thiserror::Error;

/// An error that exits with `code` instead of the default 1.
///
/// An empty message exits silently; the command already printed its output.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn silent(code: i32) -> Self {
        Self::new(code, "")
    }

    /// Map a domain error through its [`ErrorKind`].
    pub fn from_kind(kind: ErrorKind, error: impl std::fmt::Display) -> Self {
        Self::new(kind.exit_code(), error.to_string())
    }
}

/// Attach the exit code of a domain error.
pub trait WithKind<T> {
    fn with_kind(self) -> anyhow::Result<T>;
}

macro_rules! impl_with_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<T> WithKind<T> for Result<T, $ty> {
                fn with_kind(self) -> anyhow::Result<T> {
                    self.map_err(|e| ExitError::from_kind(e.kind(), e).into())
                }
            }
        )*
    };
}

impl_with_kind!(
    gv_core::ConfigError,
    gv_adapters::GitError,
    gv_daemon::DaemonError,
    gv_engine::RunnerError,
    gv_pack::PackError,
    gv_storage::ReceiptError,
);

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
