// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle notifications fanned out to subscribers.
//!
//! Every component publishes through a shared [`HookBus`]; sinks decide what to
//! do with the events (log them, record them in tests, forward them).

use crate::error_kind::ErrorKind;
use crate::fingerprint::Fingerprint;
use crate::id::{JobId, PackId, RunId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Serializes with `{"type": "job:success", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HookEvent {
    // -- registry --
    #[serde(rename = "job:discovered")]
    JobDiscovered { job_id: JobId, source: PathBuf },

    /// A definition failed validation and was left out of the catalog.
    #[serde(rename = "job:validate")]
    JobValidate { source: PathBuf, error: String },

    #[serde(rename = "job:updated")]
    JobUpdated { job_id: JobId, source: PathBuf },

    #[serde(rename = "job:removed")]
    JobRemoved { job_id: JobId },

    /// Two sources produced the same id; `winner` is kept.
    #[serde(rename = "job:conflict")]
    JobConflict {
        job_id: JobId,
        winner: PathBuf,
        loser: PathBuf,
    },

    // -- runner --
    #[serde(rename = "job:started")]
    JobStarted {
        job_id: JobId,
        run_id: RunId,
        fingerprint: Fingerprint,
        attempt: u8,
    },

    #[serde(rename = "job:skipped")]
    JobSkipped {
        job_id: JobId,
        fingerprint: Fingerprint,
        reason: String,
    },

    #[serde(rename = "job:success")]
    JobSuccess {
        job_id: JobId,
        run_id: RunId,
        fingerprint: Fingerprint,
        duration_ms: u64,
        #[serde(default)]
        artifacts: Vec<String>,
    },

    #[serde(rename = "job:error")]
    JobError {
        job_id: JobId,
        run_id: RunId,
        fingerprint: Fingerprint,
        kind: ErrorKind,
        error: String,
    },

    // -- scheduler / daemon --
    #[serde(rename = "cron:tick")]
    CronTick { minute_utc: String, jobs: Vec<JobId> },

    #[serde(rename = "daemon:state")]
    DaemonState { state: String },

    // -- packs --
    #[serde(rename = "pack:applied")]
    PackApplied {
        pack_id: PackId,
        version: String,
        fingerprint: String,
    },

    #[serde(rename = "pack:skipped")]
    PackSkipped { pack_id: PackId, fingerprint: String },

    #[serde(rename = "pack:rolled-back")]
    PackRolledBack { pack_id: PackId, failed_steps: usize },
}

impl HookEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::JobDiscovered { .. } => "job:discovered",
            HookEvent::JobValidate { .. } => "job:validate",
            HookEvent::JobUpdated { .. } => "job:updated",
            HookEvent::JobRemoved { .. } => "job:removed",
            HookEvent::JobConflict { .. } => "job:conflict",
            HookEvent::JobStarted { .. } => "job:started",
            HookEvent::JobSkipped { .. } => "job:skipped",
            HookEvent::JobSuccess { .. } => "job:success",
            HookEvent::JobError { .. } => "job:error",
            HookEvent::CronTick { .. } => "cron:tick",
            HookEvent::DaemonState { .. } => "daemon:state",
            HookEvent::PackApplied { .. } => "pack:applied",
            HookEvent::PackSkipped { .. } => "pack:skipped",
            HookEvent::PackRolledBack { .. } => "pack:rolled-back",
        }
    }

    /// One-line description for logs.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            HookEvent::JobDiscovered { job_id, source }
            | HookEvent::JobUpdated { job_id, source } => {
                format!("{t} job={job_id} source={}", source.display())
            }
            HookEvent::JobValidate { source, error } => {
                format!("{t} source={} error={error}", source.display())
            }
            HookEvent::JobRemoved { job_id } => format!("{t} job={job_id}"),
            HookEvent::JobConflict {
                job_id,
                winner,
                loser,
            } => format!(
                "{t} job={job_id} winner={} loser={}",
                winner.display(),
                loser.display()
            ),
            HookEvent::JobStarted {
                job_id,
                run_id,
                attempt,
                ..
            } => format!("{t} job={job_id} run={run_id} attempt={attempt}"),
            HookEvent::JobSkipped {
                job_id, reason, ..
            } => format!("{t} job={job_id} reason={reason}"),
            HookEvent::JobSuccess {
                job_id,
                run_id,
                duration_ms,
                ..
            } => format!("{t} job={job_id} run={run_id} duration_ms={duration_ms}"),
            HookEvent::JobError {
                job_id,
                run_id,
                kind,
                ..
            } => format!("{t} job={job_id} run={run_id} kind={kind}"),
            HookEvent::CronTick { minute_utc, jobs } => {
                format!("{t} minute={minute_utc} jobs={}", jobs.len())
            }
            HookEvent::DaemonState { state } => format!("{t} state={state}"),
            HookEvent::PackApplied {
                pack_id, version, ..
            } => format!("{t} pack={pack_id} version={version}"),
            HookEvent::PackSkipped { pack_id, .. } => format!("{t} pack={pack_id}"),
            HookEvent::PackRolledBack {
                pack_id,
                failed_steps,
            } => format!("{t} pack={pack_id} failed_steps={failed_steps}"),
        }
    }
}

/// Receives hook events.
pub trait HookSink: Send + Sync {
    fn handle(&self, event: &HookEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl HookSink for TracingSink {
    fn handle(&self, event: &HookEvent) {
        match event {
            HookEvent::JobValidate { .. }
            | HookEvent::JobConflict { .. }
            | HookEvent::JobError { .. } => tracing::warn!("{}", event.log_summary()),
            _ => tracing::info!("{}", event.log_summary()),
        }
    }
}

/// Fan-out to every subscribed sink. Cheap to clone.
#[derive(Clone, Default)]
pub struct HookBus {
    sinks: Arc<RwLock<Vec<Arc<dyn HookSink>>>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus with a [`TracingSink`] attached.
    pub fn with_tracing() -> Self {
        let bus = Self::new();
        bus.subscribe(Arc::new(TracingSink));
        bus
    }

    pub fn subscribe(&self, sink: Arc<dyn HookSink>) {
        self.sinks.write().push(sink);
    }

    pub fn emit(&self, event: HookEvent) {
        for sink in self.sinks.read().iter() {
            sink.handle(&event);
        }
    }
}

impl std::fmt::Debug for HookBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBus")
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
