// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::git::{ChangedFiles, CommitInfo, GitAdapter, GitError, NoteEntry, RefHead};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Wrapper that adds tracing to any GitAdapter
#[derive(Clone)]
pub struct TracedGit<G> {
    inner: G,
}

impl<G> TracedGit<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

/// Time `fut` inside a `git.<op>` span. Expected errors (no HEAD, no tags)
/// log at debug, everything else at warn.
async fn observe<T, F>(span: tracing::Span, fut: F) -> Result<T, GitError>
where
    F: Future<Output = Result<T, GitError>>,
{
    async {
        let start = std::time::Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::trace!(elapsed_ms, "ok"),
            Err(e @ (GitError::NoHead | GitError::NoTags)) => {
                tracing::debug!(elapsed_ms, error = %e, "no result")
            }
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "git failed"),
        }
        result
    }
    .instrument(span)
    .await
}

#[async_trait]
impl<G: GitAdapter> GitAdapter for TracedGit<G> {
    fn worktree(&self) -> &Path {
        self.inner.worktree()
    }

    fn for_worktree(&self, path: &Path) -> Self {
        Self::new(self.inner.for_worktree(path))
    }

    async fn head(&self) -> Result<String, GitError> {
        observe(tracing::debug_span!("git.head"), self.inner.head()).await
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        observe(
            tracing::debug_span!("git.current_branch"),
            self.inner.current_branch(),
        )
        .await
    }

    async fn log(&self, format: &str, args: &[&str]) -> Result<Vec<String>, GitError> {
        observe(
            tracing::debug_span!("git.log", format, args = ?args),
            self.inner.log(format, args),
        )
        .await
    }

    async fn tag(&self, name: &str, target: Option<&str>) -> Result<(), GitError> {
        let result = observe(
            tracing::info_span!("git.tag", name),
            self.inner.tag(name, target),
        )
        .await;
        if result.is_ok() {
            tracing::info!(name, "tag created");
        }
        result
    }

    async fn describe(&self) -> Result<String, GitError> {
        observe(tracing::debug_span!("git.describe"), self.inner.describe()).await
    }

    async fn changed_files(&self, range: Option<&str>) -> Result<ChangedFiles, GitError> {
        observe(
            tracing::debug_span!("git.changed_files", range = ?range),
            self.inner.changed_files(range),
        )
        .await
    }

    async fn commit_files(&self, sha: &str) -> Result<ChangedFiles, GitError> {
        observe(
            tracing::debug_span!("git.commit_files", sha),
            self.inner.commit_files(sha),
        )
        .await
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError> {
        observe(
            tracing::debug_span!("git.commit_info", sha),
            self.inner.commit_info(sha),
        )
        .await
    }

    async fn rev_list(&self, range: &str, limit: usize) -> Result<Vec<String>, GitError> {
        observe(
            tracing::debug_span!("git.rev_list", range, limit),
            self.inner.rev_list(range, limit),
        )
        .await
    }

    async fn refs(&self) -> Result<Vec<RefHead>, GitError> {
        observe(tracing::debug_span!("git.refs"), self.inner.refs()).await
    }

    async fn tag_target(&self, name: &str) -> Result<String, GitError> {
        observe(
            tracing::debug_span!("git.tag_target", name),
            self.inner.tag_target(name),
        )
        .await
    }

    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        observe(
            tracing::debug_span!("git.is_ancestor", ancestor, descendant),
            self.inner.is_ancestor(ancestor, descendant),
        )
        .await
    }

    async fn note_read(&self, notes_ref: &str, key: &str) -> Result<Option<String>, GitError> {
        observe(
            tracing::debug_span!("git.note_read", notes_ref, key),
            self.inner.note_read(notes_ref, key),
        )
        .await
    }

    async fn note_write(
        &self,
        notes_ref: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), GitError> {
        let span = tracing::info_span!("git.note_write", notes_ref, key);
        async {
            tracing::info!(payload_len = payload.len(), "writing note");
            let start = std::time::Instant::now();
            let result = self.inner.note_write(notes_ref, key, payload).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "note written"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "note write failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn note_list(&self, notes_ref: &str) -> Result<Vec<NoteEntry>, GitError> {
        observe(
            tracing::debug_span!("git.note_list", notes_ref),
            self.inner.note_list(notes_ref),
        )
        .await
    }

    async fn worktrees(&self) -> Result<Vec<PathBuf>, GitError> {
        observe(tracing::debug_span!("git.worktrees"), self.inner.worktrees()).await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
