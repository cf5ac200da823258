// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The repository a command operates on: config, Git adapter, catalog.

use crate::exit_error::{ExitError, WithKind};
use gv_adapters::{CliGit, GitAdapter, TracedGit};
use gv_core::{Config, HookBus, SystemClock};
use gv_engine::{HandlerRegistry, RunOutcome, RunRequest, Runner, RunnerConfig, RunnerDeps};
use gv_registry::{Catalog, Registry};
use gv_storage::ReceiptStore;
use std::sync::Arc;

pub struct Workspace<G: GitAdapter = TracedGit<CliGit>> {
    pub config: Config,
    pub git: G,
    pub hooks: HookBus,
}

impl Workspace {
    /// Root from `GITVAN_ROOT_DIR` (or the cwd) with the system `git`.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config::load_from_env().with_kind()?;
        let git = TracedGit::new(CliGit::new(&config.root).with_timeout(config.git_timeout()));
        Ok(Self::new(config, git))
    }
}

impl<G: GitAdapter> Workspace<G> {
    pub fn new(config: Config, git: G) -> Self {
        Self {
            config,
            git,
            hooks: HookBus::with_tracing(),
        }
    }

    /// Scan the definition roots. Invalid files are reported on stderr.
    pub fn catalog(&self) -> Arc<Catalog> {
        let mut registry = Registry::from_config(&self.config, self.hooks.clone());
        let report = registry.scan();
        for (path, reason) in &report.invalid {
            eprintln!("warning: skipping {}: {}", path.display(), reason);
        }
        for (id, winner, loser) in &report.conflicts {
            eprintln!(
                "warning: duplicate job id {}: using {}, ignoring {}",
                id,
                winner.display(),
                loser.display()
            );
        }
        registry.catalog()
    }

    pub fn receipts(&self) -> Arc<ReceiptStore<G>> {
        Arc::new(ReceiptStore::new(self.git.clone(), self.config.notes_ref.clone()))
    }

    pub fn runner(&self) -> Runner<G, SystemClock> {
        let deps = RunnerDeps {
            git: self.git.clone(),
            receipts: self.receipts(),
            handlers: HandlerRegistry::new(),
            hooks: self.hooks.clone(),
        };
        Runner::new(
            deps,
            SystemClock,
            RunnerConfig::for_worktree(&self.config, &self.config.root),
        )
    }

    /// Run requests one after another, in order.
    pub async fn run_all(&self, requests: Vec<RunRequest>) -> anyhow::Result<Vec<RunOutcome>> {
        let runner = self.runner();
        let mut outcomes = Vec::with_capacity(requests.len());
        for req in requests {
            outcomes.push(runner.run(req).await.with_kind()?);
        }
        Ok(outcomes)
    }
}

/// Unknown job id as a user error.
pub fn unknown_job(id: &str) -> anyhow::Error {
    ExitError::new(1, format!("unknown job: {}", id)).into()
}
