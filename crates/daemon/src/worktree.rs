// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll loop for one worktree.
//!
//! Each poll rescans definitions, diffs refs against the checkpoint, routes
//! the resulting events, adds due cron ticks, runs everything through the
//! job runner, and only then persists the new checkpoint. A poll that fails
//! part way leaves the checkpoint untouched so the same ref movements are
//! observed again next time; receipts keep the re-runs idempotent.

use crate::error::DaemonError;
use crate::extract::{diff_refs, extract, MAX_COMMITS_PER_REF};
use crate::lifecycle::WorktreeStatus;
use gv_adapters::GitAdapter;
use gv_core::{format_iso8601, Clock, Config, HookBus, HookEvent, JobId};
use gv_engine::{
    route, CancelToken, CronTick, CronWheel, HandlerRegistry, RunLocks, RunOutcome, RunRequest,
    Runner, RunnerConfig, RunnerDeps, RunnerError,
};
use gv_registry::Registry;
use gv_storage::{Checkpoint, ReceiptStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Shared pieces every worktree loop is built from.
pub struct LoopDeps<G: GitAdapter> {
    pub handlers: HandlerRegistry<G>,
    pub hooks: HookBus,
    pub locks: RunLocks,
    /// Cancelled when a drain overruns its deadline.
    pub drain: CancelToken,
}

/// Counts from one [`WorktreeLoop::poll_once`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// First poll without a checkpoint: refs were recorded, not fired.
    pub baseline: bool,
    pub events: usize,
    pub cron_ticks: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Advanced branches whose oldest new commits were past the limit.
    pub truncated: usize,
}

pub struct WorktreeLoop<G: GitAdapter, C: Clock> {
    worktree: PathBuf,
    git: G,
    registry: Registry,
    runner: Arc<Runner<G, C>>,
    wheel: CronWheel,
    checkpoint: Option<Checkpoint>,
    permits: Arc<Semaphore>,
    hooks: HookBus,
    clock: C,
    max_commits: usize,
    status: WorktreeStatus,
}

impl<G: GitAdapter, C: Clock> WorktreeLoop<G, C> {
    /// Build a loop for `git.worktree()`, resuming from its checkpoint.
    pub fn new(config: &Config, git: G, deps: LoopDeps<G>, clock: C) -> Result<Self, DaemonError> {
        let worktree = git.worktree().to_path_buf();
        let local = Config {
            root: worktree.clone(),
            ..config.clone()
        };
        let checkpoint = Checkpoint::load(&worktree)?;
        let wheel = CronWheel::resume(
            config.cron_replay_limit_minutes,
            checkpoint
                .as_ref()
                .and_then(|c| c.last_cron_minute.as_deref()),
        );
        let receipts = Arc::new(ReceiptStore::new(git.clone(), config.notes_ref.clone()));
        let runner = Runner::new(
            RunnerDeps {
                git: git.clone(),
                receipts,
                handlers: deps.handlers,
                hooks: deps.hooks.clone(),
            },
            clock.clone(),
            RunnerConfig::for_worktree(config, &worktree),
        )
        .with_locks(deps.locks)
        .with_drain(deps.drain);

        Ok(Self {
            registry: Registry::from_config(&local, deps.hooks.clone()),
            runner: Arc::new(runner),
            wheel,
            checkpoint,
            permits: Arc::new(Semaphore::new(config.worktree_parallel.max(1))),
            hooks: deps.hooks,
            clock,
            max_commits: MAX_COMMITS_PER_REF,
            status: WorktreeStatus {
                path: worktree.clone(),
                ..WorktreeStatus::default()
            },
            worktree,
            git,
        })
    }

    pub fn with_max_commits(mut self, max: usize) -> Self {
        self.max_commits = max.max(1);
        self
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// Running totals since the loop was created.
    pub fn status(&self) -> &WorktreeStatus {
        &self.status
    }

    /// Drop duplicate receipt lines left by concurrent writers.
    pub async fn compact_receipts(&self) {
        match self.runner.receipts().compact().await {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(worktree = %self.worktree.display(), removed, "receipts compacted")
            }
            Err(e) => {
                tracing::warn!(worktree = %self.worktree.display(), error = %e, "receipt compaction failed")
            }
        }
    }

    pub async fn poll_once(&mut self) -> Result<PollReport, DaemonError> {
        let result = self.poll_inner().await;
        self.status.polls += 1;
        self.status.last_poll = Some(format_iso8601(self.clock.utc()));
        match &result {
            Ok(report) => {
                self.status.events += report.events as u64;
                self.status.cron_ticks += report.cron_ticks as u64;
                self.status.completed += report.completed as u64;
                self.status.skipped += report.skipped as u64;
                self.status.failed += report.failed as u64;
                self.status.last_error = None;
            }
            Err(e) => self.status.last_error = Some(e.to_string()),
        }
        result
    }

    async fn poll_inner(&mut self) -> Result<PollReport, DaemonError> {
        let scan = self.registry.scan();
        if scan.changed() {
            tracing::info!(
                worktree = %self.worktree.display(),
                discovered = scan.discovered.len(),
                updated = scan.updated.len(),
                removed = scan.removed.len(),
                invalid = scan.invalid.len(),
                "definitions changed"
            );
        }
        let catalog = self.registry.catalog();
        let heads = self.git.refs().await?;
        let now = self.clock.utc();

        let mut report = PollReport::default();
        let mut requests: Vec<RunRequest> = Vec::new();

        match &self.checkpoint {
            None => {
                report.baseline = true;
                tracing::info!(
                    worktree = %self.worktree.display(),
                    refs = heads.len(),
                    "no checkpoint, recording baseline"
                );
            }
            Some(checkpoint) => {
                let diff = diff_refs(&checkpoint.refs, &heads);
                if !diff.deleted.is_empty() {
                    tracing::debug!(refs = ?diff.deleted, "refs deleted");
                }
                let extracted = extract(&self.git, &diff, self.max_commits).await?;
                report.truncated = extracted.truncated.len();
                let events = extracted.events;
                report.events = events.len();
                for meta in &events {
                    let routed = route(&catalog, meta);
                    tracing::debug!(event = %meta.describe(), jobs = routed.len(), "routed");
                    requests.extend(routed);
                }
            }
        }

        let ticks = if report.baseline {
            self.wheel.mark(now);
            Vec::new()
        } else {
            self.wheel.advance(now, &catalog)
        };
        report.cron_ticks = ticks.len();
        self.emit_ticks(&ticks);
        requests.extend(ticks.iter().filter_map(|t| t.request(&catalog)));

        self.dispatch(requests, &mut report).await;

        let checkpoint = Checkpoint {
            refs: heads.iter().map(|h| (h.full_name(), h.sha.clone())).collect(),
            last_cron_minute: self.wheel.last_minute_utc(),
            updated_at: Some(format_iso8601(now)),
            ..Checkpoint::default()
        };
        checkpoint.save(&self.worktree)?;
        self.checkpoint = Some(checkpoint);
        Ok(report)
    }

    fn emit_ticks(&self, ticks: &[CronTick]) {
        let mut by_minute: BTreeMap<String, Vec<JobId>> = BTreeMap::new();
        for tick in ticks {
            by_minute
                .entry(tick.minute_utc())
                .or_default()
                .push(tick.job_id.clone());
        }
        for (minute_utc, jobs) in by_minute {
            self.hooks.emit(HookEvent::CronTick { minute_utc, jobs });
        }
    }

    /// Run requests in observation order, at most `worktree_parallel` at a time.
    async fn dispatch(&self, requests: Vec<RunRequest>, report: &mut PollReport) {
        let mut tasks = JoinSet::new();
        for req in requests {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let runner = Arc::clone(&self.runner);
            report.dispatched += 1;
            tasks.spawn(async move {
                let _permit = permit;
                let job_id = req.job.id.clone();
                (job_id, runner.run(req).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(RunOutcome::Completed { .. }))) => report.completed += 1,
                Ok((_, Ok(RunOutcome::Skipped { .. }))) => report.skipped += 1,
                Ok((job_id, Ok(RunOutcome::Failed { error, .. }))) => {
                    report.failed += 1;
                    tracing::warn!(job_id = %job_id, error = %error, "job failed");
                }
                Ok((_, Err(RunnerError::AlreadyRunning { .. }))) => report.skipped += 1,
                Ok((job_id, Err(e))) => {
                    report.failed += 1;
                    tracing::warn!(job_id = %job_id, error = %e, "job not run");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, "run task panicked");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
