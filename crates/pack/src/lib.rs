// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Packs: versioned bundles of file transforms applied idempotently to a
//! worktree, with snapshots for rollback

mod constraint;
mod engine;
mod error;
mod registry;
mod resolve;
mod spec;
mod version;

pub use constraint::{greatest_satisfying, is_update_available, Comparator, Constraint, Op};
pub use engine::{
    ApplyOutcome, PackEngine, RollbackAction, RollbackReport, RollbackStep, StepResult,
    UpdateInfo, VerifyReport,
};
pub use error::PackError;
pub use registry::{DirRegistry, MemoryRegistry, PackRegistry};
pub use resolve::{resolve, resolve_id, Resolution};
pub use spec::{ManifestFormat, OptionDef, PackSpec, Transform, MANIFEST_FILES};
pub use version::{PreId, Version, VersionError};
