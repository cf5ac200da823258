// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every crate, and its mapping to CLI exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed definition, unknown matcher key, bad cron or semver.
    Validation,
    /// Git subprocess failed.
    Git,
    /// Missing file, permission or I/O failure.
    Filesystem,
    /// Soft or hard deadline elapsed.
    Timeout,
    /// Named lock already held.
    LockUnavailable,
    /// Divergent outcome for an existing (job, fingerprint).
    ReceiptConflict,
    /// Unresolved, conflicting or circular dependency.
    Dependency,
    /// A job body failed.
    User,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Git => "git",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Timeout => "timeout",
            ErrorKind::LockUnavailable => "lock-unavailable",
            ErrorKind::ReceiptConflict => "receipt-conflict",
            ErrorKind::Dependency => "dependency",
            ErrorKind::User => "user",
        }
    }

    /// Process exit code: 1 user/validation, 3 lock, 2 everything operational.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Validation | ErrorKind::User => 1,
            ErrorKind::LockUnavailable => 3,
            ErrorKind::Git
            | ErrorKind::Filesystem
            | ErrorKind::Timeout
            | ErrorKind::ReceiptConflict
            | ErrorKind::Dependency => 2,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_kind_tests.rs"]
mod tests;
