// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Receipts: the audit record of one execution, stored as a Git note line.

use crate::fingerprint::Fingerprint;
use crate::id::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current receipt schema version.
pub const RECEIPT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Error,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptStatus::Success => f.write_str("success"),
            ReceiptStatus::Error => f.write_str("error"),
        }
    }
}

/// One execution outcome, serialized as a single JSON line inside a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub receipt_version: u32,
    pub job_id: JobId,
    pub fingerprint: Fingerprint,
    pub status: ReceiptStatus,
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Milliseconds.
    pub duration: u64,
    /// ISO-8601 UTC.
    pub timestamp: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Receipt {
    pub fn new(
        job_id: JobId,
        fingerprint: Fingerprint,
        status: ReceiptStatus,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            receipt_version: RECEIPT_VERSION,
            job_id,
            fingerprint,
            status,
            artifacts: Vec::new(),
            duration: 0,
            timestamp: timestamp.into(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            error: None,
        }
    }

    /// Serialize as a single note line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse every receipt line in a note body, skipping blank and foreign lines.
    pub fn parse_note(body: &str) -> Vec<Receipt> {
        body.lines()
            .map(str::trim)
            .filter(|l| l.starts_with('{'))
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}

#[cfg(test)]
#[path = "receipt_tests.rs"]
mod tests;
