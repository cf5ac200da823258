// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gv-core: shared data model for the GitVan automation platform

pub mod clock;
pub mod config;
pub mod error_kind;
pub mod fingerprint;
pub mod hook;
pub mod id;
pub mod job;
pub mod metadata;
pub mod receipt;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, DEFAULT_NOTES_REF};
pub use error_kind::ErrorKind;
pub use fingerprint::{content_hash, fingerprint, payload_hash, Fingerprint, Trigger};
pub use hook::{HookBus, HookEvent, HookSink, TracingSink};
pub use id::{IdGen, JobId, PackId, RunId, SequentialIdGen, ShortId, SnapshotId, UlidGen, UuidIdGen};
pub use job::{ExecOptions, JobKind, JobMeta, JobResult};
pub use metadata::{EventMetadata, PullRequest};
pub use receipt::{Receipt, ReceiptStatus, RECEIPT_VERSION};
pub use time_fmt::{
    floor_minute, format_elapsed, format_elapsed_ms, format_iso8601, format_minute, parse_duration,
    parse_minute,
};
