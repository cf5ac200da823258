// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation job context.

use gv_adapters::GitAdapter;
use gv_core::{JobId, RunId};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Fires once when a run passes its soft deadline (or the daemon drains).
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Sending half of a [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelToken {
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_handle, token) = Self::pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pending forever for [`CancelToken::never`].
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Everything a handler can see about the run it is executing.
#[derive(Debug, Clone)]
pub struct JobContext<G: GitAdapter> {
    pub run_id: RunId,
    pub job_id: JobId,
    /// ISO-8601 UTC.
    pub start_time: String,
    pub worktree: PathBuf,
    /// Working directory for shell steps (worktree, or `options.cwd` under it).
    pub cwd: PathBuf,
    pub branch: String,
    pub head: String,
    /// Environment for shell steps, on top of the deterministic base.
    pub env: BTreeMap<String, String>,
    /// Template variables for `${name}` interpolation.
    pub vars: BTreeMap<String, String>,
    pub git: G,
    pub cancel: CancelToken,
    /// Upper bound for one step subprocess: the job timeout plus grace.
    pub step_limit: Duration,
}

/// Template variables derived from the run and its payload.
///
/// Top-level scalar payload fields are exposed by name, string arrays are
/// comma-joined, and the first created tag is also exposed as `tag`.
pub fn template_vars(
    run_id: &RunId,
    job_id: &JobId,
    stamp: &str,
    branch: &str,
    head: &str,
    payload: &Value,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                _ => continue,
            };
            vars.insert(key.clone(), rendered);
        }
        if let Some(tag) = map
            .get("tagsCreated")
            .and_then(Value::as_array)
            .and_then(|tags| tags.first())
            .and_then(Value::as_str)
        {
            vars.insert("tag".to_string(), tag.to_string());
        }
    }
    vars.insert("job.id".to_string(), job_id.to_string());
    vars.insert("run.id".to_string(), run_id.to_string());
    vars.insert("timestamp".to_string(), stamp.to_string());
    vars.entry("branch".to_string())
        .or_insert_with(|| branch.to_string());
    vars.insert("head".to_string(), head.to_string());
    vars
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
