// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::context::{CancelToken, JobContext};
use gv_adapters::FakeGit;
use gv_core::{JobId, RunId};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// A context rooted at `worktree` with a never-cancelled token.
pub(crate) fn job_context(worktree: &Path, job: &str) -> JobContext<FakeGit> {
    job_context_with(worktree, job, CancelToken::never())
}

pub(crate) fn job_context_with(
    worktree: &Path,
    job: &str,
    cancel: CancelToken,
) -> JobContext<FakeGit> {
    let mut vars = BTreeMap::new();
    vars.insert("job.id".to_string(), job.to_string());
    vars.insert("branch".to_string(), "main".to_string());
    JobContext {
        run_id: RunId::new("run-1"),
        job_id: JobId::new(job),
        start_time: "2026-03-01T02:00:00.000Z".to_string(),
        worktree: worktree.to_path_buf(),
        cwd: worktree.to_path_buf(),
        branch: "main".to_string(),
        head: "0".repeat(40),
        env: BTreeMap::new(),
        vars,
        git: FakeGit::new(worktree),
        cancel,
        step_limit: Duration::from_secs(30),
    }
}

/// Parse a TOML job definition, panicking on invalid input.
pub(crate) fn job_from_toml(id: &str, content: &str) -> gv_registry::JobDefinition {
    gv_registry::parse_job_with_format(
        content,
        gv_registry::Format::Toml,
        id,
        &Path::new("jobs").join(format!("{}.toml", id)),
    )
    .unwrap()
}

pub(crate) fn event_from_toml(id: &str, content: &str) -> gv_registry::EventDefinition {
    gv_registry::parse_event_with_format(
        content,
        gv_registry::Format::Toml,
        id,
        &Path::new("events").join(format!("{}.toml", id)),
        None,
    )
    .unwrap()
}
