// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installed-pack records in `.gitvan/state/packs.json`.

use crate::persist::{load_json, save_json, PersistError};
use gv_core::config::state_dir_for;
use gv_core::{PackId, SnapshotId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const PACKS_FILE: &str = "packs.json";
pub const PACK_STATE_VERSION: &str = "1.0";
/// Operations log length.
pub const MAX_OPERATIONS: usize = 100;

/// How an apply changed a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactChange {
    Created,
    Modified,
    Deleted,
}

/// One file touched by a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackArtifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    /// Content hash after apply; absent for deleted files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Pre-apply snapshot; absent for created files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotId>,
    pub change: ArtifactChange,
}

impl PackArtifact {
    pub fn file(
        path: impl Into<String>,
        change: ArtifactChange,
        hash: Option<String>,
        snapshot: Option<SnapshotId>,
    ) -> Self {
        Self {
            kind: "file".to_string(),
            path: path.into(),
            hash,
            snapshot,
            change,
        }
    }
}

/// Record of an installed pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackState {
    pub version: String,
    pub fingerprint: String,
    pub installed_at: String,
    #[serde(default)]
    pub artifacts: Vec<PackArtifact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Apply,
    Skip,
    Rollback,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Apply => "apply",
            OperationKind::Skip => "skip",
            OperationKind::Rollback => "rollback",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackOperation {
    pub op: OperationKind,
    pub pack_id: PackId,
    pub version: String,
    pub at: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Contents of `packs.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackStateFile {
    pub version: String,
    #[serde(default)]
    pub packs: BTreeMap<PackId, PackState>,
    #[serde(default)]
    pub operations: Vec<PackOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for PackStateFile {
    fn default() -> Self {
        Self {
            version: PACK_STATE_VERSION.to_string(),
            packs: BTreeMap::new(),
            operations: Vec::new(),
            last_updated: None,
        }
    }
}

impl PackStateFile {
    pub fn get(&self, id: &PackId) -> Option<&PackState> {
        self.packs.get(id)
    }

    /// Append to the operations log, keeping the newest [`MAX_OPERATIONS`].
    pub fn log(&mut self, op: PackOperation) {
        self.operations.push(op);
        if self.operations.len() > MAX_OPERATIONS {
            let excess = self.operations.len() - MAX_OPERATIONS;
            self.operations.drain(..excess);
        }
    }

    /// Snapshot ids still referenced by an installed pack.
    pub fn referenced_snapshots(&self) -> std::collections::BTreeSet<SnapshotId> {
        self.packs
            .values()
            .flat_map(|p| p.artifacts.iter())
            .filter_map(|a| a.snapshot.clone())
            .collect()
    }
}

/// Reads and writes `packs.json` for one worktree.
#[derive(Debug, Clone)]
pub struct PackStateStore {
    path: PathBuf,
}

impl PackStateStore {
    pub fn for_worktree(worktree: &Path) -> Self {
        Self::at(state_dir_for(worktree).join(PACKS_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<PackStateFile, PersistError> {
        Ok(load_json(&self.path)?.unwrap_or_default())
    }

    /// Stamp `last_updated` and write atomically.
    pub fn save(&self, state: &mut PackStateFile, now: &str) -> Result<(), PersistError> {
        state.last_updated = Some(now.to_string());
        save_json(&self.path, state)
    }
}

#[cfg(test)]
#[path = "pack_state_tests.rs"]
mod tests;
