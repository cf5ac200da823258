// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `git` subprocess adapter

use super::parse::{self, COMMIT_FORMAT, REFS_FORMAT};
use super::{ChangedFiles, CommitInfo, GitAdapter, GitError, NoteEntry, RefHead};
use crate::subprocess::{deterministic_env, run_with_timeout, stderr_tail, SubprocessError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

const STDERR_TAIL: usize = 2048;

/// Adapter that shells out to the `git` binary.
#[derive(Debug, Clone)]
pub struct CliGit {
    cwd: PathBuf,
    timeout: Duration,
}

impl CliGit {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            timeout: crate::env::git_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.cwd);
        deterministic_env(&mut cmd);
        cmd
    }

    /// Run git, returning raw output regardless of exit status.
    async fn exec(&self, operation: &str, args: &[&str]) -> Result<Output, GitError> {
        let cmd = self.command(args);
        tracing::trace!(operation, ?args, cwd = %self.cwd.display(), "git");
        run_with_timeout(cmd, self.timeout, operation)
            .await
            .map_err(|e| match e {
                SubprocessError::TimedOut { timeout, .. } => GitError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                },
                SubprocessError::Spawn { source, .. } => GitError::Io {
                    operation: operation.to_string(),
                    source,
                },
            })
    }

    /// Run git and require a zero exit status; returns stdout.
    async fn run(&self, operation: &str, args: &[&str]) -> Result<String, GitError> {
        let output = self.exec(operation, args).await?;
        if !output.status.success() {
            return Err(operation_error(operation, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn parents(&self, sha: &str) -> Result<Vec<String>, GitError> {
        let out = self
            .run("rev-list --parents", &["rev-list", "--parents", "-n", "1", sha])
            .await?;
        Ok(out.split_whitespace().skip(1).map(str::to_string).collect())
    }
}

fn operation_error(operation: &str, output: &Output) -> GitError {
    GitError::Operation {
        operation: operation.to_string(),
        exit_code: output.status.code(),
        stderr: stderr_tail(&output.stderr, STDERR_TAIL),
    }
}

#[async_trait]
impl GitAdapter for CliGit {
    fn worktree(&self) -> &Path {
        &self.cwd
    }

    fn for_worktree(&self, path: &Path) -> Self {
        Self {
            cwd: path.to_path_buf(),
            timeout: self.timeout,
        }
    }

    async fn head(&self) -> Result<String, GitError> {
        let output = self
            .exec("rev-parse HEAD", &["rev-parse", "--verify", "-q", "HEAD"])
            .await?;
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || sha.is_empty() {
            if output.status.code() == Some(1) {
                return Err(GitError::NoHead);
            }
            return Err(operation_error("rev-parse HEAD", &output));
        }
        Ok(sha)
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let output = self
            .exec("symbolic-ref", &["symbolic-ref", "--short", "-q", "HEAD"])
            .await?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Some(1) => Ok("HEAD".to_string()),
            _ => Err(operation_error("symbolic-ref", &output)),
        }
    }

    async fn log(&self, format: &str, args: &[&str]) -> Result<Vec<String>, GitError> {
        let format_arg = format!("--format={}", format);
        let mut full = vec!["log", format_arg.as_str()];
        full.extend_from_slice(args);
        let out = self.run("log", &full).await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    async fn tag(&self, name: &str, target: Option<&str>) -> Result<(), GitError> {
        let mut args = vec!["tag", name];
        if let Some(target) = target {
            args.push(target);
        }
        self.run("tag", &args).await.map(|_| ())
    }

    async fn describe(&self) -> Result<String, GitError> {
        let output = self
            .exec("describe", &["describe", "--tags", "--abbrev=0"])
            .await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No names found")
            || stderr.contains("No tags can describe")
            || stderr.contains("cannot describe")
        {
            return Err(GitError::NoTags);
        }
        if stderr.contains("Needed a single revision") || stderr.contains("bad revision") {
            return Err(GitError::NoHead);
        }
        Err(operation_error("describe", &output))
    }

    async fn changed_files(&self, range: Option<&str>) -> Result<ChangedFiles, GitError> {
        let mut args = vec!["diff", "--name-status", "-z", "-M"];
        match range {
            Some(range) => args.push(range),
            None => args.push("HEAD"),
        }
        let out = self.run("diff", &args).await?;
        Ok(parse::parse_name_status_z(&out))
    }

    async fn commit_files(&self, sha: &str) -> Result<ChangedFiles, GitError> {
        let parents = self.parents(sha).await?;
        let out = match parents.first() {
            Some(parent) => {
                self.run(
                    "diff",
                    &["diff", "--name-status", "-z", "-M", parent.as_str(), sha],
                )
                .await?
            }
            None => {
                self.run(
                    "diff-tree",
                    &[
                        "diff-tree",
                        "-r",
                        "-z",
                        "--no-commit-id",
                        "--name-status",
                        "--root",
                        sha,
                    ],
                )
                .await?
            }
        };
        Ok(parse::parse_name_status_z(&out))
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError> {
        let format_arg = format!("--format={}", COMMIT_FORMAT);
        let out = self
            .run("log -1", &["log", "-1", format_arg.as_str(), sha])
            .await?;
        parse::parse_commit_info(&out).ok_or_else(|| GitError::Parse {
            operation: "log -1".to_string(),
            detail: format!("cannot parse commit {}", sha),
        })
    }

    async fn rev_list(&self, range: &str, limit: usize) -> Result<Vec<String>, GitError> {
        let max = format!("--max-count={}", limit);
        let out = self
            .run("rev-list", &["rev-list", "--reverse", max.as_str(), range])
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    async fn refs(&self) -> Result<Vec<RefHead>, GitError> {
        let format_arg = format!("--format={}", REFS_FORMAT);
        let out = self
            .run(
                "for-each-ref",
                &["for-each-ref", format_arg.as_str(), "refs/heads", "refs/tags"],
            )
            .await?;
        Ok(parse::parse_refs(&out))
    }

    async fn tag_target(&self, name: &str) -> Result<String, GitError> {
        let spec = format!("refs/tags/{}^{{commit}}", name);
        let out = self
            .run("rev-parse tag", &["rev-parse", "--verify", spec.as_str()])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        let output = self
            .exec(
                "merge-base",
                &["merge-base", "--is-ancestor", ancestor, descendant],
            )
            .await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(operation_error("merge-base", &output)),
        }
    }

    async fn note_read(&self, notes_ref: &str, key: &str) -> Result<Option<String>, GitError> {
        let ref_arg = format!("--ref={}", notes_ref);
        let output = self
            .exec("notes show", &["notes", ref_arg.as_str(), "show", key])
            .await?;
        if output.status.success() {
            return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no note found") {
            return Ok(None);
        }
        Err(operation_error("notes show", &output))
    }

    async fn note_write(
        &self,
        notes_ref: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), GitError> {
        let ref_arg = format!("--ref={}", notes_ref);
        self.run(
            "notes add",
            &["notes", ref_arg.as_str(), "add", "-f", "-m", payload, key],
        )
        .await
        .map(|_| ())
    }

    async fn note_list(&self, notes_ref: &str) -> Result<Vec<NoteEntry>, GitError> {
        let ref_arg = format!("--ref={}", notes_ref);
        let output = self
            .exec("notes list", &["notes", ref_arg.as_str(), "list"])
            .await?;
        if !output.status.success() {
            // A ref that was never written has no notes.
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.trim().is_empty() || stderr.contains("not a valid ref") {
                return Ok(Vec::new());
            }
            return Err(operation_error("notes list", &output));
        }
        Ok(parse::parse_note_list(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn worktrees(&self) -> Result<Vec<PathBuf>, GitError> {
        let out = self
            .run("worktree list", &["worktree", "list", "--porcelain"])
            .await?;
        Ok(parse::parse_worktrees(&out))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
