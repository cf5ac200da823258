// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-apply file snapshots.
//!
//! Each snapshot is a blob at `.gitvan/state/snapshots/<id>` with a
//! `<id>.json` sidecar recording the original path and content hash.

use crate::persist::{load_json, save_json, write_atomic, PersistError};
use chrono::{DateTime, Utc};
use gv_core::config::state_dir_for;
use gv_core::{content_hash, format_iso8601, ErrorKind, IdGen, SnapshotId, UlidGen};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("snapshot {0} not found")]
    NotFound(SnapshotId),
    #[error("snapshot {id} is corrupt: expected hash {expected}, found {actual}")]
    Corrupt {
        id: SnapshotId,
        expected: String,
        actual: String,
    },
}

impl SnapshotError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Filesystem
    }
}

/// Sidecar metadata for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    /// Worktree-relative path of the original file.
    pub path: String,
    pub hash: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Blob store for snapshots under one worktree.
#[derive(Clone)]
pub struct SnapshotStore<I: IdGen = UlidGen> {
    dir: PathBuf,
    ids: I,
}

impl SnapshotStore<UlidGen> {
    pub fn for_worktree(worktree: &Path) -> Self {
        Self::with_ids(state_dir_for(worktree).join("snapshots"), UlidGen)
    }
}

impl<I: IdGen> SnapshotStore<I> {
    pub fn with_ids(dir: impl Into<PathBuf>, ids: I) -> Self {
        Self {
            dir: dir.into(),
            ids,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, id: &SnapshotId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    fn sidecar_path(&self, id: &SnapshotId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Store `bytes` as the pre-image of `path`.
    pub fn capture(
        &self,
        path: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SnapshotRecord, SnapshotError> {
        let record = SnapshotRecord {
            id: SnapshotId::new(self.ids.next()),
            path: path.to_string(),
            hash: content_hash(bytes),
            size: bytes.len() as u64,
            created_at: now,
        };
        write_atomic(&self.blob_path(&record.id), bytes)?;
        save_json(&self.sidecar_path(&record.id), &record)?;
        tracing::debug!(id = %record.id, path, hash = %record.hash, "snapshot captured");
        Ok(record)
    }

    pub fn record(&self, id: &SnapshotId) -> Result<SnapshotRecord, SnapshotError> {
        load_json(&self.sidecar_path(id))?.ok_or_else(|| SnapshotError::NotFound(id.clone()))
    }

    /// Snapshot content, verified against the recorded hash.
    pub fn read(&self, id: &SnapshotId) -> Result<Vec<u8>, SnapshotError> {
        let record = self.record(id)?;
        let path = self.blob_path(id);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(id.clone()))
            }
            Err(e) => return Err(PersistError::io(&path, e).into()),
        };
        let actual = content_hash(&bytes);
        if actual != record.hash {
            return Err(SnapshotError::Corrupt {
                id: id.clone(),
                expected: record.hash,
                actual,
            });
        }
        Ok(bytes)
    }

    /// Every readable sidecar, oldest first.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistError::io(&self.dir, e).into()),
        };
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = load_json::<SnapshotRecord>(&path)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Delete snapshots older than `retention`, except those in `keep`.
    /// Returns the pruned ids.
    pub fn prune(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
        keep: &BTreeSet<SnapshotId>,
    ) -> Result<Vec<SnapshotId>, SnapshotError> {
        let window = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut pruned = Vec::new();
        for record in self.list()? {
            if record.created_at >= cutoff || keep.contains(&record.id) {
                continue;
            }
            for path in [self.blob_path(&record.id), self.sidecar_path(&record.id)] {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(PersistError::io(&path, e).into()),
                }
            }
            pruned.push(record.id);
        }
        if !pruned.is_empty() {
            tracing::info!(
                count = pruned.len(),
                cutoff = %format_iso8601(cutoff),
                "pruned expired snapshots"
            );
        }
        Ok(pruned)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
