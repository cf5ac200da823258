// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! GitVan execution engine: job runner, cron wheel, and event router

mod activity_logger;
mod backoff;
pub mod context;
mod cron_wheel;
mod error;
pub mod handler;
mod locks;
pub mod log_paths;
pub mod router;
mod runner;

#[cfg(test)]
mod test_helpers;

pub use activity_logger::JobLogger;
pub use backoff::Backoff;
pub use context::{template_vars, CancelHandle, CancelToken, JobContext};
pub use cron_wheel::{CronTick, CronWheel};
pub use error::RunnerError;
pub use handler::{HandlerError, HandlerOutput, HandlerRegistry, JobHandler, StepsHandler};
pub use locks::{RunLockGuard, RunLocks};
pub use router::{event_matcher, job_matcher, route};
pub use runner::{RunOutcome, RunRequest, Runner, RunnerConfig, RunnerDeps};
