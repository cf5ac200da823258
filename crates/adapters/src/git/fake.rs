// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory Git adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ChangedFiles, CommitInfo, GitAdapter, GitError, NoteEntry, RefHead, RefKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base author time for generated commits (2026-03-01T02:00:00Z).
const BASE_TIME: i64 = 1_772_330_400;

/// Recorded adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Head,
    CurrentBranch,
    Log { format: String },
    Tag { name: String },
    Describe,
    ChangedFiles { range: Option<String> },
    CommitFiles { sha: String },
    CommitInfo { sha: String },
    RevList { range: String, limit: usize },
    Refs,
    TagTarget { name: String },
    IsAncestor { ancestor: String, descendant: String },
    NoteRead { notes_ref: String, key: String },
    NoteWrite { notes_ref: String, key: String },
    NoteList { notes_ref: String },
    Worktrees,
}

/// A commit known to the fake repository.
#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub info: CommitInfo,
    pub files: ChangedFiles,
}

#[derive(Default)]
struct FakeGitState {
    branch: String,
    detached: Option<String>,
    branches: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
    commits: HashMap<String, FakeCommit>,
    order: Vec<String>,
    notes: HashMap<String, BTreeMap<String, String>>,
    worktrees: Vec<PathBuf>,
    calls: Vec<GitCall>,
    fail_note_writes: bool,
}

impl FakeGitState {
    fn head(&self) -> Option<String> {
        self.detached
            .clone()
            .or_else(|| self.branches.get(&self.branch).cloned())
    }

    fn resolve(&self, rev: &str) -> Result<String, GitError> {
        if rev == "HEAD" {
            return self.head().ok_or(GitError::NoHead);
        }
        if let Some(sha) = self.branches.get(rev).or_else(|| self.tags.get(rev)) {
            return Ok(sha.clone());
        }
        if self.commits.contains_key(rev) {
            return Ok(rev.to_string());
        }
        Err(GitError::Operation {
            operation: "rev-parse".to_string(),
            exit_code: Some(128),
            stderr: format!("fatal: bad revision '{}'", rev),
        })
    }

    fn reachable(&self, from: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(sha) = stack.pop() {
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&sha) {
                stack.extend(commit.info.parents.iter().cloned());
            }
        }
        seen
    }

    /// Commits in `a..b` (or everything reachable from `b`), oldest first.
    fn range(&self, range: &str) -> Result<Vec<String>, GitError> {
        let (exclude, include) = match range.split_once("..") {
            Some((a, b)) => (Some(self.resolve(a)?), self.resolve(b)?),
            None => (None, self.resolve(range)?),
        };
        let mut set = self.reachable(&include);
        if let Some(exclude) = exclude {
            for sha in self.reachable(&exclude) {
                set.remove(&sha);
            }
        }
        Ok(self
            .order
            .iter()
            .filter(|sha| set.contains(*sha))
            .cloned()
            .collect())
    }

    fn record(&mut self, call: GitCall) {
        self.calls.push(call);
    }
}

/// Fake Git adapter backed by an in-memory commit graph.
///
/// Clones (and [`for_worktree`](GitAdapter::for_worktree) views) share state.
#[derive(Clone)]
pub struct FakeGit {
    cwd: PathBuf,
    inner: Arc<Mutex<FakeGitState>>,
}

impl Default for FakeGit {
    fn default() -> Self {
        Self::new("/fake/repo")
    }
}

impl FakeGit {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            inner: Arc::new(Mutex::new(FakeGitState {
                branch: "main".to_string(),
                ..FakeGitState::default()
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    /// Commit `files` as modifications on the current branch.
    pub fn commit(&self, message: &str, modified: &[&str]) -> String {
        let files = ChangedFiles {
            modified: modified.iter().map(|f| f.to_string()).collect(),
            ..ChangedFiles::default()
        };
        self.commit_files_with(message, files)
    }

    /// Commit with explicit change sets on the current branch.
    pub fn commit_files_with(&self, message: &str, files: ChangedFiles) -> String {
        let branch = self.inner.lock().branch.clone();
        self.commit_on(&branch, message, files)
    }

    /// Commit on `branch`, creating it if needed.
    pub fn commit_on(&self, branch: &str, message: &str, files: ChangedFiles) -> String {
        let mut inner = self.inner.lock();
        let parents: Vec<String> = inner.branches.get(branch).cloned().into_iter().collect();
        let sha = Self::insert(&mut inner, message, parents, files);
        inner.branches.insert(branch.to_string(), sha.clone());
        sha
    }

    /// Merge commit on `into` with parents `[into, from]`.
    pub fn merge(&self, into: &str, from: &str, message: &str, files: ChangedFiles) -> String {
        let mut inner = self.inner.lock();
        let parents: Vec<String> = [inner.branches.get(into), inner.branches.get(from)]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let sha = Self::insert(&mut inner, message, parents, files);
        inner.branches.insert(into.to_string(), sha.clone());
        sha
    }

    fn insert(
        inner: &mut FakeGitState,
        message: &str,
        parents: Vec<String>,
        files: ChangedFiles,
    ) -> String {
        let n = inner.order.len() as u64 + 1;
        let sha = format!("{:040x}", n);
        let info = CommitInfo {
            sha: sha.clone(),
            author_name: "Test Author".to_string(),
            author_email: "author@example.com".to_string(),
            timestamp: BASE_TIME + n as i64 * 60,
            parents,
            signature: 'N',
            message: message.to_string(),
        };
        inner.commits.insert(sha.clone(), FakeCommit { info, files });
        inner.order.push(sha.clone());
        sha
    }

    /// Point `branch` at `sha` without committing.
    pub fn create_branch(&self, branch: &str, sha: &str) {
        self.inner
            .lock()
            .branches
            .insert(branch.to_string(), sha.to_string());
    }

    pub fn delete_branch(&self, branch: &str) {
        self.inner.lock().branches.remove(branch);
    }

    pub fn checkout(&self, branch: &str) {
        let mut inner = self.inner.lock();
        inner.branch = branch.to_string();
        inner.detached = None;
    }

    pub fn detach(&self, sha: &str) {
        self.inner.lock().detached = Some(sha.to_string());
    }

    pub fn add_tag(&self, name: &str, sha: &str) {
        self.inner
            .lock()
            .tags
            .insert(name.to_string(), sha.to_string());
    }

    /// Edit a commit's metadata (author, signature, message).
    pub fn update_commit(&self, sha: &str, f: impl FnOnce(&mut CommitInfo)) {
        if let Some(commit) = self.inner.lock().commits.get_mut(sha) {
            f(&mut commit.info);
        }
    }

    pub fn set_worktrees(&self, worktrees: Vec<PathBuf>) {
        self.inner.lock().worktrees = worktrees;
    }

    /// Make every subsequent `note_write` fail.
    pub fn fail_note_writes(&self, fail: bool) {
        self.inner.lock().fail_note_writes = fail;
    }

    /// Raw note bodies under `notes_ref`, keyed by target.
    pub fn notes(&self, notes_ref: &str) -> BTreeMap<String, String> {
        self.inner
            .lock()
            .notes
            .get(notes_ref)
            .cloned()
            .unwrap_or_default()
    }

    pub fn head_sha(&self) -> Option<String> {
        self.inner.lock().head()
    }
}

#[async_trait]
impl GitAdapter for FakeGit {
    fn worktree(&self) -> &Path {
        &self.cwd
    }

    fn for_worktree(&self, path: &Path) -> Self {
        Self {
            cwd: path.to_path_buf(),
            inner: Arc::clone(&self.inner),
        }
    }

    async fn head(&self) -> Result<String, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Head);
        inner.head().ok_or(GitError::NoHead)
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::CurrentBranch);
        if inner.detached.is_some() {
            return Ok("HEAD".to_string());
        }
        Ok(inner.branch.clone())
    }

    /// Subjects of commits reachable from HEAD, newest first; `format` is ignored.
    async fn log(&self, format: &str, _args: &[&str]) -> Result<Vec<String>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Log {
            format: format.to_string(),
        });
        let Some(head) = inner.head() else {
            return Ok(Vec::new());
        };
        let mut shas = inner.range(&head)?;
        shas.reverse();
        Ok(shas
            .iter()
            .filter_map(|sha| inner.commits.get(sha))
            .map(|c| c.info.subject().to_string())
            .collect())
    }

    async fn tag(&self, name: &str, target: Option<&str>) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Tag {
            name: name.to_string(),
        });
        let sha = inner.resolve(target.unwrap_or("HEAD"))?;
        inner.tags.insert(name.to_string(), sha);
        Ok(())
    }

    async fn describe(&self) -> Result<String, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Describe);
        let head = inner.head().ok_or(GitError::NoHead)?;
        let mut cursor = Some(head);
        while let Some(sha) = cursor {
            if let Some((name, _)) = inner.tags.iter().rev().find(|(_, t)| **t == sha) {
                return Ok(name.clone());
            }
            cursor = inner
                .commits
                .get(&sha)
                .and_then(|c| c.info.parents.first().cloned());
        }
        Err(GitError::NoTags)
    }

    async fn changed_files(&self, range: Option<&str>) -> Result<ChangedFiles, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::ChangedFiles {
            range: range.map(str::to_string),
        });
        let Some(range) = range else {
            return Ok(ChangedFiles::default());
        };
        let mut files = ChangedFiles::default();
        for sha in inner.range(range)? {
            if let Some(commit) = inner.commits.get(&sha) {
                files.added.extend(commit.files.added.iter().cloned());
                files.modified.extend(commit.files.modified.iter().cloned());
                files.deleted.extend(commit.files.deleted.iter().cloned());
                files.renamed.extend(commit.files.renamed.iter().cloned());
            }
        }
        Ok(files)
    }

    async fn commit_files(&self, sha: &str) -> Result<ChangedFiles, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::CommitFiles {
            sha: sha.to_string(),
        });
        let sha = inner.resolve(sha)?;
        Ok(inner
            .commits
            .get(&sha)
            .map(|c| c.files.clone())
            .unwrap_or_default())
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::CommitInfo {
            sha: sha.to_string(),
        });
        let sha = inner.resolve(sha)?;
        inner
            .commits
            .get(&sha)
            .map(|c| c.info.clone())
            .ok_or_else(|| GitError::Parse {
                operation: "log -1".to_string(),
                detail: format!("unknown commit {}", sha),
            })
    }

    async fn rev_list(&self, range: &str, limit: usize) -> Result<Vec<String>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::RevList {
            range: range.to_string(),
            limit,
        });
        let shas = inner.range(range)?;
        let skip = shas.len().saturating_sub(limit);
        Ok(shas.into_iter().skip(skip).collect())
    }

    async fn refs(&self) -> Result<Vec<RefHead>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Refs);
        let branches = inner.branches.iter().map(|(name, sha)| RefHead {
            kind: RefKind::Branch,
            name: name.clone(),
            sha: sha.clone(),
        });
        let tags = inner.tags.iter().map(|(name, sha)| RefHead {
            kind: RefKind::Tag,
            name: name.clone(),
            sha: sha.clone(),
        });
        Ok(branches.chain(tags).collect())
    }

    async fn tag_target(&self, name: &str) -> Result<String, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::TagTarget {
            name: name.to_string(),
        });
        inner.tags.get(name).cloned().ok_or_else(|| GitError::Operation {
            operation: "rev-parse tag".to_string(),
            exit_code: Some(128),
            stderr: format!("fatal: unknown tag {}", name),
        })
    }

    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::IsAncestor {
            ancestor: ancestor.to_string(),
            descendant: descendant.to_string(),
        });
        let ancestor = inner.resolve(ancestor)?;
        let descendant = inner.resolve(descendant)?;
        Ok(inner.reachable(&descendant).contains(&ancestor))
    }

    async fn note_read(&self, notes_ref: &str, key: &str) -> Result<Option<String>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::NoteRead {
            notes_ref: notes_ref.to_string(),
            key: key.to_string(),
        });
        Ok(inner
            .notes
            .get(notes_ref)
            .and_then(|notes| notes.get(key))
            .cloned())
    }

    async fn note_write(
        &self,
        notes_ref: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::NoteWrite {
            notes_ref: notes_ref.to_string(),
            key: key.to_string(),
        });
        if inner.fail_note_writes {
            return Err(GitError::Operation {
                operation: "notes add".to_string(),
                exit_code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }
        inner
            .notes
            .entry(notes_ref.to_string())
            .or_default()
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn note_list(&self, notes_ref: &str) -> Result<Vec<NoteEntry>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::NoteList {
            notes_ref: notes_ref.to_string(),
        });
        Ok(inner
            .notes
            .get(notes_ref)
            .map(|notes| {
                notes
                    .iter()
                    .map(|(target, body)| NoteEntry {
                        note: gv_core::content_hash(body.as_bytes()),
                        target: target.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn worktrees(&self) -> Result<Vec<PathBuf>, GitError> {
        let mut inner = self.inner.lock();
        inner.record(GitCall::Worktrees);
        if inner.worktrees.is_empty() {
            return Ok(vec![self.cwd.clone()]);
        }
        Ok(inner.worktrees.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
