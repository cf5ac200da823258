// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon supervisor: one poll loop per worktree under a global cap.

use crate::error::DaemonError;
use crate::lifecycle::{DaemonStatus, WorktreeStatus};
use crate::state::{DaemonState, StateCell};
use crate::worktree::{LoopDeps, WorktreeLoop};
use chrono::{DateTime, Utc};
use gv_adapters::GitAdapter;
use gv_core::{format_iso8601, Clock, Config, HookBus, HookEvent};
use gv_engine::{CancelHandle, CancelToken, HandlerRegistry, RunLocks};
use gv_storage::{PackStateStore, SnapshotStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Minimum spacing between maintenance passes over one worktree.
const MAINTENANCE_INTERVAL_SECS: i64 = 3600;

/// Collaborators for a [`Daemon`].
pub struct DaemonDeps<G: GitAdapter> {
    /// Adapter rooted at the main worktree; other worktrees are derived from it.
    pub git: G,
    pub handlers: HandlerRegistry<G>,
    pub hooks: HookBus,
}

struct Running {
    shutdown: CancelHandle,
    drain: CancelHandle,
    tasks: JoinSet<()>,
}

type Statuses = Arc<Mutex<BTreeMap<PathBuf, WorktreeStatus>>>;

pub struct Daemon<G: GitAdapter, C: Clock> {
    config: Config,
    git: G,
    handlers: HandlerRegistry<G>,
    hooks: HookBus,
    clock: C,
    state: StateCell,
    statuses: Statuses,
    started_at: Mutex<Option<String>>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl<G: GitAdapter, C: Clock> Daemon<G, C> {
    pub fn new(config: Config, deps: DaemonDeps<G>, clock: C) -> Self {
        Self {
            config,
            git: deps.git,
            handlers: deps.handlers,
            hooks: deps.hooks,
            clock,
            state: StateCell::default(),
            statuses: Arc::new(Mutex::new(BTreeMap::new())),
            started_at: Mutex::new(None),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state.get()
    }

    /// `idle|stopped → starting → running`.
    ///
    /// Fails (ending in `stopped`) when worktrees cannot be listed or a
    /// worktree's checkpoint cannot be read.
    pub async fn start(&self) -> Result<(), DaemonError> {
        let mut running = self.running.lock().await;
        self.state.transition(
            &[DaemonState::Idle, DaemonState::Stopped],
            DaemonState::Starting,
            "start",
        )?;
        self.emit_state();

        match self.spawn_loops().await {
            Ok(r) => {
                *running = Some(r);
                *self.started_at.lock() = Some(format_iso8601(self.clock.utc()));
                self.state.set(DaemonState::Running);
                self.emit_state();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "daemon failed to start");
                self.state.set(DaemonState::Stopped);
                self.emit_state();
                Err(e)
            }
        }
    }

    /// `running → draining → stopped`.
    ///
    /// Loops stop taking new ticks at once. In-flight runs get the drain
    /// deadline; past it they are cancelled (and recorded as timeouts), and
    /// after a further grace period the loops are aborted.
    pub async fn stop(&self) -> Result<(), DaemonError> {
        let mut running = self.running.lock().await;
        self.state
            .transition(&[DaemonState::Running], DaemonState::Draining, "stop")?;
        self.emit_state();

        if let Some(r) = running.take() {
            self.drain(r).await;
        }

        *self.started_at.lock() = None;
        self.state.set(DaemonState::Stopped);
        self.emit_state();
        Ok(())
    }

    pub async fn restart(&self) -> Result<(), DaemonError> {
        self.stop().await?;
        self.start().await
    }

    /// Current state and per-worktree counters.
    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            pid: std::process::id(),
            state: self.state.get(),
            started_at: self.started_at.lock().clone(),
            worktrees: self.statuses.lock().values().cloned().collect(),
            updated_at: format_iso8601(self.clock.utc()),
        }
    }

    fn emit_state(&self) {
        self.hooks.emit(HookEvent::DaemonState {
            state: self.state.get().to_string(),
        });
    }

    async fn spawn_loops(&self) -> Result<Running, DaemonError> {
        let worktrees = self.git.worktrees().await?;
        let cap = self.config.max_parallel.min(worktrees.len()).max(1);
        let global = Arc::new(Semaphore::new(cap));
        let (shutdown, shutdown_token) = CancelToken::pair();
        let (drain, drain_token) = CancelToken::pair();

        let mut loops = Vec::with_capacity(worktrees.len());
        for path in &worktrees {
            let deps = LoopDeps {
                handlers: self.handlers.clone(),
                hooks: self.hooks.clone(),
                locks: RunLocks::new(),
                drain: drain_token.clone(),
            };
            let wt = WorktreeLoop::new(
                &self.config,
                self.git.for_worktree(path),
                deps,
                self.clock.clone(),
            )?;
            loops.push(wt);
        }

        self.statuses.lock().clear();
        let mut tasks = JoinSet::new();
        for wt in loops {
            self.statuses
                .lock()
                .insert(wt.worktree().to_path_buf(), wt.status().clone());
            let task = LoopTask {
                global: Arc::clone(&global),
                shutdown: shutdown_token.clone(),
                interval: self.config.poll_interval(),
                retention: self.config.snapshot_retention(),
                statuses: Arc::clone(&self.statuses),
                clock: self.clock.clone(),
            };
            tasks.spawn(task.run(wt));
        }
        tracing::info!(
            worktrees = worktrees.len(),
            max_parallel = cap,
            "daemon started"
        );

        Ok(Running {
            shutdown,
            drain,
            tasks,
        })
    }

    async fn drain(&self, mut running: Running) {
        running.shutdown.cancel();
        let deadline = self.config.drain_deadline();
        if tokio::time::timeout(deadline, join_all(&mut running.tasks))
            .await
            .is_ok()
        {
            tracing::info!("drained");
            return;
        }

        tracing::warn!(
            deadline_ms = deadline.as_millis() as u64,
            "drain deadline elapsed, cancelling in-flight runs"
        );
        running.drain.cancel();
        if tokio::time::timeout(self.config.grace(), join_all(&mut running.tasks))
            .await
            .is_err()
        {
            tracing::warn!("runs ignored cancellation, aborting worktree loops");
            running.tasks.abort_all();
            join_all(&mut running.tasks).await;
        }
    }
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!(error = %e, "worktree loop panicked");
            }
        }
    }
}

struct LoopTask<C: Clock> {
    global: Arc<Semaphore>,
    shutdown: CancelToken,
    interval: Duration,
    retention: Duration,
    statuses: Statuses,
    clock: C,
}

impl<C: Clock> LoopTask<C> {
    async fn run<G: GitAdapter>(self, mut wt: WorktreeLoop<G, C>) {
        let path = wt.worktree().to_path_buf();
        let mut last_maintenance: Option<DateTime<Utc>> = None;
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let permit = tokio::select! {
                p = Arc::clone(&self.global).acquire_owned() => p,
                _ = self.shutdown.cancelled() => break,
            };
            let Ok(permit) = permit else { break };

            if let Err(e) = wt.poll_once().await {
                tracing::warn!(worktree = %path.display(), error = %e, "poll failed");
            }
            drop(permit);
            self.statuses.lock().insert(path.clone(), wt.status().clone());

            let now = self.clock.utc();
            let due = last_maintenance
                .map_or(true, |at| (now - at).num_seconds() >= MAINTENANCE_INTERVAL_SECS);
            if due {
                prune_snapshots(&path, self.retention, now);
                wt.compact_receipts().await;
                last_maintenance = Some(now);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }
        tracing::debug!(worktree = %path.display(), "worktree loop stopped");
    }
}

/// Drop expired snapshots no installed pack still references.
pub fn prune_snapshots(worktree: &Path, retention: Duration, now: DateTime<Utc>) {
    let keep = match PackStateStore::for_worktree(worktree).load() {
        Ok(state) => state.referenced_snapshots(),
        Err(e) => {
            tracing::warn!(worktree = %worktree.display(), error = %e, "cannot read pack state, skipping prune");
            return;
        }
    };
    if let Err(e) = SnapshotStore::for_worktree(worktree).prune(retention, now, &keep) {
        tracing::warn!(worktree = %worktree.display(), error = %e, "snapshot prune failed");
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
