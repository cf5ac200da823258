// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::hook::{HookEvent, HookSink};
use crate::metadata::EventMetadata;
use crate::receipt::{Receipt, ReceiptStatus};
use crate::{fingerprint, JobId, Trigger};
use parking_lot::Mutex;

/// Sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HookEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(HookEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl HookSink for RecordingSink {
    fn handle(&self, event: &HookEvent) {
        self.events.lock().push(event.clone());
    }
}

// ── Metadata builders ───────────────────────────────────────────────────────

/// Commit on `branch` touching `files`.
pub fn commit_metadata(commit: &str, branch: &str, files: &[&str]) -> EventMetadata {
    let mut meta = EventMetadata {
        commit: Some(commit.to_string()),
        branch: Some(branch.to_string()),
        files_modified: files.iter().map(|f| f.to_string()).collect(),
        timestamp: "2026-03-01T00:00:00.000Z".to_string(),
        ..EventMetadata::default()
    };
    meta.normalize_files();
    meta
}

/// Commit with the given message and no files.
pub fn message_metadata(commit: &str, message: &str) -> EventMetadata {
    EventMetadata {
        commit: Some(commit.to_string()),
        branch: Some("main".to_string()),
        message: Some(message.to_string()),
        ..EventMetadata::default()
    }
}

/// Tag creation at `commit`.
pub fn tag_metadata(commit: &str, tag: &str) -> EventMetadata {
    EventMetadata {
        commit: Some(commit.to_string()),
        tags_created: vec![tag.to_string()],
        ..EventMetadata::default()
    }
}

// ── Receipt builders ────────────────────────────────────────────────────────

/// Receipt for a cron run of `job` at `minute`.
pub fn cron_receipt(job: &str, minute: &str, status: ReceiptStatus) -> Receipt {
    let trigger = Trigger::Cron {
        minute_utc: minute.to_string(),
    };
    let mut receipt = Receipt::new(
        JobId::new(job),
        fingerprint(job, "1.0.0", &trigger),
        status,
        "2026-03-01T02:00:00.000Z",
    );
    receipt.metadata = serde_json::json!({ "trigger": trigger });
    receipt
}
