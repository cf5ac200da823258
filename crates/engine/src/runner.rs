// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner: exactly-once execution per `(job, fingerprint)`.
//!
//! A run takes the in-process lock for its key, consults the receipt store,
//! executes the handler under a soft deadline (cooperative cancel) and a hard
//! deadline (`timeout + grace`, the handler future is dropped), retries with
//! backoff, and finally records a receipt while still holding the lock.

use crate::activity_logger::JobLogger;
use crate::backoff::Backoff;
use crate::context::{template_vars, CancelHandle, CancelToken, JobContext};
use crate::error::RunnerError;
use crate::handler::{HandlerError, HandlerOutput, HandlerRegistry, JobHandler, StepsHandler};
use crate::locks::RunLocks;
use gv_adapters::GitAdapter;
use gv_core::config::logs_dir_for;
use gv_core::{
    fingerprint, format_elapsed_ms, format_iso8601, Clock, Config, Fingerprint, HookBus,
    HookEvent, IdGen, JobId, JobResult, Receipt, ReceiptStatus, RunId, Trigger, UlidGen,
};
use gv_registry::{JobAction, JobDefinition};
use gv_storage::{ReceiptStore, RecordOutcome};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Runner path and deadline configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Soft deadline for jobs that do not set `options.timeout`.
    pub default_timeout: Duration,
    /// Extra time after the soft deadline before the run is dropped.
    pub grace: Duration,
    /// Directory for per-job activity logs
    pub logs_dir: PathBuf,
}

impl RunnerConfig {
    pub fn for_worktree(config: &Config, worktree: &Path) -> Self {
        Self {
            default_timeout: config.job_timeout(),
            grace: config.grace(),
            logs_dir: logs_dir_for(worktree),
        }
    }
}

/// Runner collaborators
pub struct RunnerDeps<G: GitAdapter> {
    pub git: G,
    pub receipts: Arc<ReceiptStore<G>>,
    pub handlers: HandlerRegistry<G>,
    pub hooks: HookBus,
}

/// One request to execute a job.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub job: JobDefinition,
    pub trigger: Trigger,
    pub payload: Value,
    /// Whether the run consults and writes the receipt store.
    pub recorded: bool,
}

impl RunRequest {
    pub fn new(job: JobDefinition, trigger: Trigger, payload: Value) -> Self {
        Self {
            job,
            trigger,
            payload,
            recorded: true,
        }
    }

    /// On-demand run keyed on the payload hash.
    pub fn on_demand(job: JobDefinition, payload: Value) -> Self {
        let trigger = Trigger::on_demand(&payload);
        Self::new(job, trigger, payload)
    }

    /// Skip the receipt gate and do not record the outcome.
    pub fn unrecorded(mut self) -> Self {
        self.recorded = false;
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self.job.id.as_str(), self.job.version(), &self.trigger)
    }
}

/// Result of [`Runner::run`].
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        run_id: RunId,
        receipt: Receipt,
        result: JobResult,
    },
    /// A receipt already exists for this fingerprint.
    Skipped {
        fingerprint: Fingerprint,
        reason: String,
    },
    /// Retries exhausted; an error receipt was recorded.
    Failed {
        run_id: RunId,
        receipt: Receipt,
        error: RunnerError,
    },
}

impl RunOutcome {
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            RunOutcome::Completed { receipt, .. } | RunOutcome::Failed { receipt, .. } => {
                Some(receipt)
            }
            RunOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Executes jobs for one worktree.
pub struct Runner<G: GitAdapter, C: Clock, I: IdGen = UlidGen> {
    git: G,
    receipts: Arc<ReceiptStore<G>>,
    handlers: HandlerRegistry<G>,
    hooks: HookBus,
    locks: RunLocks,
    clock: C,
    ids: I,
    backoff: Backoff,
    drain: CancelToken,
    logger: JobLogger,
    config: RunnerConfig,
}

impl<G: GitAdapter, C: Clock> Runner<G, C> {
    pub fn new(deps: RunnerDeps<G>, clock: C, config: RunnerConfig) -> Self {
        Self {
            git: deps.git,
            receipts: deps.receipts,
            handlers: deps.handlers,
            hooks: deps.hooks,
            locks: RunLocks::new(),
            clock,
            ids: UlidGen,
            backoff: Backoff::default(),
            drain: CancelToken::never(),
            logger: JobLogger::new(config.logs_dir.clone()),
            config,
        }
    }
}

impl<G: GitAdapter, C: Clock, I: IdGen> Runner<G, C, I> {
    pub fn with_ids<J: IdGen>(self, ids: J) -> Runner<G, C, J> {
        Runner {
            git: self.git,
            receipts: self.receipts,
            handlers: self.handlers,
            hooks: self.hooks,
            locks: self.locks,
            clock: self.clock,
            ids,
            backoff: self.backoff,
            drain: self.drain,
            logger: self.logger,
            config: self.config,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Share a lock table with other runners.
    pub fn with_locks(mut self, locks: RunLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Token that cancels every in-flight run when the daemon drains.
    pub fn with_drain(mut self, drain: CancelToken) -> Self {
        self.drain = drain;
        self
    }

    pub fn receipts(&self) -> &Arc<ReceiptStore<G>> {
        &self.receipts
    }

    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    pub fn worktree(&self) -> &Path {
        self.git.worktree()
    }

    /// Run `req` to a terminal outcome.
    ///
    /// Fails fast with [`RunnerError::AlreadyRunning`] when the lock is held;
    /// nothing is recorded then. A job that cannot start (unknown handler,
    /// missing cwd, unreadable HEAD) ends as [`RunOutcome::Failed`] with an
    /// error receipt like any other failure.
    pub async fn run(&self, req: RunRequest) -> Result<RunOutcome, RunnerError> {
        let job_id = req.job.id.clone();
        let fp = req.fingerprint();
        let key = RunLocks::key(job_id.as_str(), fp.as_str());
        let Some(_guard) = self.locks.try_acquire(&key) else {
            tracing::debug!(job_id = %job_id, fingerprint = %fp, "run lock held");
            return Err(RunnerError::AlreadyRunning {
                job_id,
                fingerprint: fp,
            });
        };

        if req.recorded && self.receipts.has(&job_id, &fp).await? {
            let reason = "receipt exists".to_string();
            tracing::debug!(job_id = %job_id, fingerprint = %fp, trigger = %req.trigger, "skipping");
            self.hooks.emit(HookEvent::JobSkipped {
                job_id,
                fingerprint: fp.clone(),
                reason: reason.clone(),
            });
            return Ok(RunOutcome::Skipped {
                fingerprint: fp,
                reason,
            });
        }

        let run_id = RunId::new(self.ids.next());
        let setup = match self.resolve_handler(&req.job) {
            Ok(handler) => self
                .build_context(&req, &run_id)
                .await
                .map(|(ctx, cancel)| (handler, ctx, cancel)),
            Err(e) => Err(e),
        };
        let (handler, mut ctx, mut cancel) = match setup {
            Ok(parts) => parts,
            Err(error) => return self.setup_failed(&req, run_id, fp, error).await,
        };

        self.logger.append(
            job_id.as_str(),
            "start",
            &format!("run={} trigger={} fingerprint={}", run_id, req.trigger, fp),
        );
        let started = self.clock.now();
        let timeout = req.job.options.timeout_or(self.config.default_timeout);
        let max_attempts = req.job.options.retries.saturating_add(1);

        let mut attempt: u8 = 1;
        let result = loop {
            self.hooks.emit(HookEvent::JobStarted {
                job_id: job_id.clone(),
                run_id: run_id.clone(),
                fingerprint: fp.clone(),
                attempt,
            });
            tracing::info!(job_id = %job_id, run_id = %run_id, attempt, "job attempt");

            match self
                .attempt(&handler, &ctx, &cancel, &req, timeout)
                .await
            {
                Ok(output) => break Ok(output),
                Err(e) => {
                    self.logger
                        .append(job_id.as_str(), "error", &format!("attempt {}: {}", attempt, e));
                    if attempt >= max_attempts || self.drain.is_cancelled() {
                        break Err(e);
                    }
                    let delay = self.backoff.next_delay(attempt);
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "job attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    // fresh token per attempt; the previous one may be cancelled
                    let (handle, token) = CancelToken::pair();
                    ctx.cancel = token;
                    cancel = handle;
                }
            }
        };

        let duration_ms = self.clock.now().duration_since(started).as_millis() as u64;
        let metadata = json!({
            "runId": run_id.as_str(),
            "trigger": &req.trigger,
            "attempts": attempt,
            "branch": &ctx.branch,
            "head": &ctx.head,
        });
        let timestamp = format_iso8601(self.clock.utc());

        match result {
            Ok(output) => {
                let mut receipt =
                    Receipt::new(job_id.clone(), fp.clone(), ReceiptStatus::Success, timestamp);
                receipt.artifacts = output.artifacts.clone();
                receipt.duration = duration_ms;
                receipt.metadata = metadata;
                if req.recorded {
                    self.record(&receipt).await?;
                }
                self.log_output(job_id.as_str(), &output);
                self.logger.append(
                    job_id.as_str(),
                    "done",
                    &format!("success in {}", format_elapsed_ms(duration_ms)),
                );
                self.hooks.emit(HookEvent::JobSuccess {
                    job_id,
                    run_id: run_id.clone(),
                    fingerprint: fp,
                    duration_ms,
                    artifacts: output.artifacts.clone(),
                });
                Ok(RunOutcome::Completed {
                    run_id,
                    receipt,
                    result: JobResult::ok(output.output, output.artifacts, duration_ms),
                })
            }
            Err(error) => {
                let mut receipt =
                    Receipt::new(job_id.clone(), fp.clone(), ReceiptStatus::Error, timestamp);
                receipt.duration = duration_ms;
                receipt.metadata = metadata;
                receipt.error = Some(error.to_string());
                if req.recorded {
                    self.record(&receipt).await?;
                }
                self.logger.append(
                    job_id.as_str(),
                    "done",
                    &format!("error after {}", format_elapsed_ms(duration_ms)),
                );
                self.hooks.emit(HookEvent::JobError {
                    job_id,
                    run_id: run_id.clone(),
                    fingerprint: fp,
                    kind: error.kind(),
                    error: error.to_string(),
                });
                Ok(RunOutcome::Failed {
                    run_id,
                    receipt,
                    error,
                })
            }
        }
    }

    /// Record a run that never reached its handler.
    async fn setup_failed(
        &self,
        req: &RunRequest,
        run_id: RunId,
        fp: Fingerprint,
        error: RunnerError,
    ) -> Result<RunOutcome, RunnerError> {
        let job_id = req.job.id.clone();
        tracing::warn!(job_id = %job_id, run_id = %run_id, error = %error, "job setup failed");
        let mut receipt = Receipt::new(
            job_id.clone(),
            fp.clone(),
            ReceiptStatus::Error,
            format_iso8601(self.clock.utc()),
        );
        receipt.metadata = json!({
            "runId": run_id.as_str(),
            "trigger": &req.trigger,
            "attempts": 0,
        });
        receipt.error = Some(error.to_string());
        if req.recorded {
            self.record(&receipt).await?;
        }
        self.logger
            .append(job_id.as_str(), "error", &format!("setup: {}", error));
        self.hooks.emit(HookEvent::JobError {
            job_id,
            run_id: run_id.clone(),
            fingerprint: fp,
            kind: error.kind(),
            error: error.to_string(),
        });
        Ok(RunOutcome::Failed {
            run_id,
            receipt,
            error,
        })
    }

    fn resolve_handler(&self, job: &JobDefinition) -> Result<Arc<dyn JobHandler<G>>, RunnerError> {
        match &job.action {
            JobAction::Steps(steps) => Ok(Arc::new(StepsHandler::new(steps.clone()))),
            JobAction::Handler(name) => {
                self.handlers
                    .get(name)
                    .ok_or_else(|| RunnerError::ContextSetup {
                        job_id: job.id.clone(),
                        message: format!("no handler registered as {:?}", name),
                    })
            }
        }
    }

    async fn build_context(
        &self,
        req: &RunRequest,
        run_id: &RunId,
    ) -> Result<(JobContext<G>, CancelHandle), RunnerError> {
        let job_id = &req.job.id;
        let setup = |e: gv_adapters::GitError| RunnerError::ContextSetup {
            job_id: job_id.clone(),
            message: e.to_string(),
        };
        let head = self.git.head().await.map_err(setup)?;
        let branch = self.git.current_branch().await.map_err(setup)?;

        let worktree = self.git.worktree().to_path_buf();
        let cwd = match &req.job.options.cwd {
            Some(rel) => worktree.join(rel),
            None => worktree.clone(),
        };
        if !cwd.is_dir() {
            return Err(RunnerError::ContextSetup {
                job_id: job_id.clone(),
                message: format!("working directory {} does not exist", cwd.display()),
            });
        }

        let now = self.clock.utc();
        let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let vars = template_vars(run_id, job_id, &stamp, &branch, &head, &req.payload);
        let (handle, token) = CancelToken::pair();
        let step_limit =
            req.job.options.timeout_or(self.config.default_timeout) + self.config.grace;
        let ctx = JobContext {
            run_id: run_id.clone(),
            job_id: job_id.clone(),
            start_time: format_iso8601(now),
            worktree,
            cwd,
            branch,
            head,
            env: req.job.options.env.clone(),
            vars,
            git: self.git.clone(),
            cancel: token,
            step_limit,
        };
        Ok((ctx, handle))
    }

    /// One handler invocation under the soft and hard deadlines.
    async fn attempt(
        &self,
        handler: &Arc<dyn JobHandler<G>>,
        ctx: &JobContext<G>,
        cancel: &CancelHandle,
        req: &RunRequest,
        timeout: Duration,
    ) -> Result<HandlerOutput, RunnerError> {
        let job_id = &req.job.id;
        let fut = handler.run(ctx, &req.payload, &req.job.meta);
        tokio::pin!(fut);

        tokio::select! {
            res = &mut fut => return res.map_err(|e| self.handler_error(job_id, e, timeout)),
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(job_id = %job_id, timeout_ms = timeout.as_millis() as u64, "soft deadline reached");
            }
            _ = self.drain.cancelled() => {
                tracing::warn!(job_id = %job_id, "cancelled by drain");
            }
        }

        cancel.cancel();
        let hard = tokio::time::timeout(self.config.grace, &mut fut).await.is_err();
        if hard {
            tracing::error!(job_id = %job_id, grace_ms = self.config.grace.as_millis() as u64, "hard deadline reached, abandoning run");
        }
        Err(RunnerError::Timeout {
            job_id: job_id.clone(),
            after_ms: timeout.as_millis() as u64,
            hard,
        })
    }

    fn handler_error(&self, job_id: &JobId, e: HandlerError, timeout: Duration) -> RunnerError {
        match e {
            HandlerError::Cancelled => RunnerError::Timeout {
                job_id: job_id.clone(),
                after_ms: timeout.as_millis() as u64,
                hard: false,
            },
            other => RunnerError::User {
                job_id: job_id.clone(),
                message: other.to_string(),
            },
        }
    }

    async fn record(&self, receipt: &Receipt) -> Result<(), RunnerError> {
        match self.receipts.record(receipt).await? {
            RecordOutcome::Recorded { .. } => {}
            RecordOutcome::Duplicate => {
                tracing::info!(
                    job_id = %receipt.job_id,
                    fingerprint = %receipt.fingerprint,
                    "receipt already recorded elsewhere"
                );
            }
        }
        Ok(())
    }

    fn log_output(&self, job_id: &str, output: &HandlerOutput) {
        let Some(steps) = output.output.get("steps").and_then(Value::as_array) else {
            return;
        };
        for step in steps {
            if let (Some(label), Some(stdout)) = (
                step.get("step").and_then(Value::as_str),
                step.get("stdout").and_then(Value::as_str),
            ) {
                if !stdout.is_empty() {
                    self.logger.append_fenced(job_id, label, stdout);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
