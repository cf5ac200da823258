// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git repository adapter

mod cli;
pub(crate) mod parse;

pub use cli::CliGit;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCommit, FakeGit, GitCall};

use async_trait::async_trait;
use gv_core::{ErrorKind, EventMetadata};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from Git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {operation} failed (exit {}): {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    Operation {
        operation: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("repository has no commits")]
    NoHead,
    #[error("no tags found")]
    NoTags,
    #[error("git {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("git {operation}: {source}")]
    Io {
        operation: String,
        source: std::io::Error,
    },
    #[error("unexpected output from git {operation}: {detail}")]
    Parse { operation: String, detail: String },
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::Timeout { .. } => ErrorKind::Timeout,
            GitError::Io { .. } => ErrorKind::Filesystem,
            _ => ErrorKind::Git,
        }
    }
}

/// Kind of ref returned by [`GitAdapter::refs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    Branch,
    Tag,
}

/// A branch or tag head. Tags are peeled to the commit they point at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefHead {
    pub kind: RefKind,
    /// Short name (`main`, `v1.2.3`).
    pub name: String,
    pub sha: String,
}

impl RefHead {
    /// Checkpoint key: `refs/heads/<name>` or `refs/tags/<name>`.
    pub fn full_name(&self) -> String {
        match self.kind {
            RefKind::Branch => format!("refs/heads/{}", self.name),
            RefKind::Tag => format!("refs/tags/{}", self.name),
        }
    }
}

/// Paths relative to the worktree root, grouped by change type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFiles {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    /// `(from, to)` pairs.
    pub renamed: Vec<(String, String)>,
}

impl ChangedFiles {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
    }

    /// Copy into metadata file sets; renamed destinations count as changed.
    pub fn apply_to(&self, meta: &mut EventMetadata) {
        meta.files_added = self.added.clone();
        meta.files_modified = self.modified.clone();
        meta.files_deleted = self.deleted.clone();
        meta.files_changed = self.renamed.iter().map(|(_, to)| to.clone()).collect();
        meta.normalize_files();
    }
}

/// Author, message and topology of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    /// Author time, seconds since the epoch.
    pub timestamp: i64,
    pub parents: Vec<String>,
    /// `%G?` signature status letter.
    pub signature: char,
    /// Subject and body.
    pub message: String,
}

impl CommitInfo {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Good signatures, including unknown validity or expired keys.
    pub fn is_signed(&self) -> bool {
        matches!(self.signature, 'G' | 'U' | 'X' | 'Y' | 'R')
    }

    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// One entry of `git notes list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub note: String,
    /// Object the note is attached to.
    pub target: String,
}

/// Narrow interface to a local Git worktree.
///
/// Every invocation runs under `TZ=UTC`, `LANG=C`, with the worktree as cwd
/// and a bounded timeout.
#[async_trait]
pub trait GitAdapter: Clone + Send + Sync + 'static {
    /// Worktree this adapter operates on.
    fn worktree(&self) -> &Path;

    /// The same adapter bound to another worktree.
    fn for_worktree(&self, path: &Path) -> Self;

    /// 40-hex HEAD commit; [`GitError::NoHead`] on an empty repository.
    async fn head(&self) -> Result<String, GitError>;

    /// Short branch name, or `"HEAD"` when detached.
    async fn current_branch(&self) -> Result<String, GitError>;

    /// `git log --format=<format> <args>`, newest first, one entry per line.
    async fn log(&self, format: &str, args: &[&str]) -> Result<Vec<String>, GitError>;

    /// Create a lightweight tag at `target` (HEAD when `None`).
    async fn tag(&self, name: &str, target: Option<&str>) -> Result<(), GitError>;

    /// Nearest tag reachable from HEAD; [`GitError::NoTags`] when there is none.
    async fn describe(&self) -> Result<String, GitError>;

    /// [`describe`](Self::describe) with "no tags" recovered to `None`.
    async fn describe_opt(&self) -> Result<Option<String>, GitError> {
        match self.describe().await {
            Ok(tag) => Ok(Some(tag)),
            Err(GitError::NoTags) | Err(GitError::NoHead) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Changes over `range` (`a..b`), or between HEAD and the working tree.
    async fn changed_files(&self, range: Option<&str>) -> Result<ChangedFiles, GitError>;

    /// Changes introduced by one commit against its first parent.
    async fn commit_files(&self, sha: &str) -> Result<ChangedFiles, GitError>;

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError>;

    /// Commits in `range`, oldest first, at most `limit` (the newest ones).
    async fn rev_list(&self, range: &str, limit: usize) -> Result<Vec<String>, GitError>;

    /// Branch and tag heads.
    async fn refs(&self) -> Result<Vec<RefHead>, GitError>;

    /// Commit a tag points at.
    async fn tag_target(&self, name: &str) -> Result<String, GitError>;

    /// Whether `ancestor` is reachable from `descendant`.
    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError>;

    async fn note_read(&self, notes_ref: &str, key: &str) -> Result<Option<String>, GitError>;

    /// Replace the note on `key`.
    async fn note_write(&self, notes_ref: &str, key: &str, payload: &str)
        -> Result<(), GitError>;

    async fn note_list(&self, notes_ref: &str) -> Result<Vec<NoteEntry>, GitError>;

    /// Absolute worktree paths, main worktree first.
    async fn worktrees(&self) -> Result<Vec<PathBuf>, GitError>;
}
