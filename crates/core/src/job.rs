// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job kinds, metadata, execution options, and results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default soft deadline for a job run.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum number of retries a job may request.
pub const MAX_RETRIES: u8 = 5;

/// Maximum job priority.
pub const MAX_PRIORITY: u8 = 10;

/// How a job is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    OnDemand,
    Cron,
    Event,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::OnDemand => "on-demand",
            JobKind::Cron => "cron",
            JobKind::Event => "event",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata attached to a job definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Job version; part of every fingerprint so bumping it re-arms the job.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// 0..=10, higher wins id conflicts during discovery.
    #[serde(default)]
    pub priority: u8,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl JobMeta {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Self::default()
        }
    }
}

/// Per-job execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Soft deadline in milliseconds; `None` uses the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Retries after the first attempt (0..=5).
    #[serde(default)]
    pub retries: u8,
    /// Whether this job may run alongside other runs of itself in the same worktree.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Working directory relative to the worktree root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl ExecOptions {
    /// Effective soft deadline, falling back to `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }
}

/// Outcome of a single job invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub success: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Paths relative to the worktree root, recorded verbatim.
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub duration_ms: u64,
    pub exit_code: i32,
}

impl JobResult {
    pub fn ok(output: serde_json::Value, artifacts: Vec<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            artifacts,
            duration_ms,
            exit_code: 0,
        }
    }

    pub fn failed(error: impl Into<String>, duration_ms: u64, exit_code: i32) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            artifacts: Vec::new(),
            duration_ms,
            exit_code,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
