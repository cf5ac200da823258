// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job handlers: the code a run executes.
//!
//! A job either lists declarative steps, executed by [`StepsHandler`], or
//! names a handler registered in a [`HandlerRegistry`]. Both go through the
//! same runner contract.

use crate::context::JobContext;
use async_trait::async_trait;
use gv_adapters::subprocess::{
    deterministic_env, run_with_timeout, stderr_tail, SubprocessError,
};
use gv_adapters::GitAdapter;
use gv_core::JobMeta;
use gv_registry::{interpolate, interpolate_shell, StepDef};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

const STDERR_TAIL: usize = 2048;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{message}")]
    Failed { message: String, exit_code: i32 },
    #[error("cancelled")]
    Cancelled,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed {
            message: message.into(),
            exit_code: 1,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            HandlerError::Failed { exit_code, .. } => *exit_code,
            HandlerError::Cancelled => 124,
            HandlerError::Io { .. } => 1,
        }
    }
}

/// What a successful handler returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
    pub output: Value,
    /// Worktree-relative paths, recorded verbatim in the receipt.
    pub artifacts: Vec<String>,
}

#[async_trait]
pub trait JobHandler<G: GitAdapter>: Send + Sync {
    async fn run(
        &self,
        ctx: &JobContext<G>,
        payload: &Value,
        meta: &JobMeta,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// Named Rust handlers that job files refer to with `handler = "<name>"`.
pub struct HandlerRegistry<G: GitAdapter> {
    handlers: HashMap<String, Arc<dyn JobHandler<G>>>,
}

impl<G: GitAdapter> Default for HandlerRegistry<G> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<G: GitAdapter> Clone for HandlerRegistry<G> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<G: GitAdapter> HandlerRegistry<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler<G>>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler<G>>> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Runs declarative `shell` and `write` steps in order.
pub struct StepsHandler {
    steps: Vec<StepDef>,
}

impl StepsHandler {
    pub fn new(steps: Vec<StepDef>) -> Self {
        Self { steps }
    }

    async fn shell<G: GitAdapter>(
        &self,
        ctx: &JobContext<G>,
        label: &str,
        command: &str,
    ) -> Result<Value, HandlerError> {
        let rendered = interpolate_shell(command, &ctx.vars);
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&rendered).current_dir(&ctx.cwd);
        deterministic_env(&mut cmd);
        cmd.envs(&ctx.env)
            .env("GITVAN_JOB_ID", ctx.job_id.as_str())
            .env("GITVAN_RUN_ID", ctx.run_id.as_str())
            .env("GITVAN_WORKTREE", &ctx.worktree);

        let description = format!("step {}", label);
        let output = tokio::select! {
            res = run_with_timeout(cmd, ctx.step_limit, &description) => res,
            _ = ctx.cancel.cancelled() => return Err(HandlerError::Cancelled),
        };
        let output = output.map_err(|e| match e {
            SubprocessError::TimedOut { .. } => HandlerError::Cancelled,
            other => HandlerError::failed(other.to_string()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(HandlerError::Failed {
                message: format!(
                    "{} exited with {}: {}",
                    label,
                    code,
                    stderr_tail(&output.stderr, STDERR_TAIL)
                ),
                exit_code: code,
            });
        }
        Ok(json!({ "step": label, "stdout": stdout }))
    }

    async fn write<G: GitAdapter>(
        &self,
        ctx: &JobContext<G>,
        path: &str,
        content: &str,
    ) -> Result<String, HandlerError> {
        let rel = interpolate(path, &ctx.vars);
        if !is_contained(Path::new(&rel)) {
            return Err(HandlerError::failed(format!(
                "write path {:?} escapes the worktree",
                rel
            )));
        }
        let full = ctx.worktree.join(&rel);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| HandlerError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&full, interpolate(content, &ctx.vars))
            .await
            .map_err(|source| HandlerError::Io { path: full, source })?;
        Ok(rel)
    }
}

fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl<G: GitAdapter> JobHandler<G> for StepsHandler {
    async fn run(
        &self,
        ctx: &JobContext<G>,
        _payload: &Value,
        _meta: &JobMeta,
    ) -> Result<HandlerOutput, HandlerError> {
        let mut steps = Vec::new();
        let mut artifacts = Vec::new();
        for (i, step) in self.steps.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(HandlerError::Cancelled);
            }
            let label = step.label(i);
            match step {
                StepDef::Shell { command, .. } => {
                    steps.push(self.shell(ctx, &label, command).await?);
                }
                StepDef::Write { path, content, .. } => {
                    let rel = self.write(ctx, path, content).await?;
                    steps.push(json!({ "step": label, "wrote": rel }));
                    artifacts.push(rel);
                }
            }
        }
        Ok(HandlerOutput {
            output: json!({ "steps": steps }),
            artifacts,
        })
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
