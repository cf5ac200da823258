// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitVan daemon library
//!
//! The supervisor, per-worktree poll loops and the process files shared with
//! the `gitvan` CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod daemon;
pub mod env;
mod error;
pub mod extract;
mod lifecycle;
pub mod logging;
mod serve;
mod state;
mod worktree;

pub use daemon::{prune_snapshots, Daemon, DaemonDeps};
pub use error::DaemonError;
pub use extract::{diff_refs, parse_merge, MergeSource, RefDiff};
pub use lifecycle::{
    read_pid, DaemonPaths, DaemonStatus, PidLock, WorktreeStatus, STARTUP_MARKER_PREFIX,
};
pub use serve::{serve, serve_repository};
pub use state::{DaemonState, StateCell};
pub use worktree::{LoopDeps, PollReport, WorktreeLoop};
