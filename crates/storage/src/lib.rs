// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for GitVan: receipts in Git notes, per-worktree state files

mod checkpoint;
mod pack_state;
mod persist;
mod receipts;
mod snapshot;

pub use checkpoint::{Checkpoint, CHECKPOINT_FILE};
pub use pack_state::{
    ArtifactChange, OperationKind, PackArtifact, PackOperation, PackState, PackStateFile,
    PackStateStore, MAX_OPERATIONS, PACKS_FILE, PACK_STATE_VERSION,
};
pub use persist::{load_json, save_json, write_atomic, PersistError};
pub use receipts::{ReceiptError, ReceiptFilter, ReceiptStore, RecordOutcome};
pub use snapshot::{SnapshotError, SnapshotRecord, SnapshotStore};
