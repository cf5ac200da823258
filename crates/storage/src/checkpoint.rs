// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worktree poll checkpoint.
//!
//! Records the last observed head of every branch and tag plus the last cron
//! minute evaluated, so a restarted daemon resumes where it stopped.

use crate::persist::{load_json, save_json, PersistError};
use gv_core::config::state_dir_for;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CHECKPOINT_FILE: &str = "checkpoint.json";
const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub version: u32,
    /// Full ref name (`refs/heads/main`, `refs/tags/v1.0.0`) to commit SHA.
    #[serde(default)]
    pub refs: BTreeMap<String, String>,
    /// Last cron minute evaluated (`YYYY-MM-DDTHH:MMZ`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cron_minute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            refs: BTreeMap::new(),
            last_cron_minute: None,
            updated_at: None,
        }
    }
}

impl Checkpoint {
    pub fn path_for(worktree: &Path) -> PathBuf {
        state_dir_for(worktree).join(CHECKPOINT_FILE)
    }

    /// `Ok(None)` on first run (or after a corrupt file was set aside).
    pub fn load(worktree: &Path) -> Result<Option<Self>, PersistError> {
        load_json(&Self::path_for(worktree))
    }

    pub fn save(&self, worktree: &Path) -> Result<(), PersistError> {
        save_json(&Self::path_for(worktree), self)
    }

    pub fn head(&self, full_ref: &str) -> Option<&str> {
        self.refs.get(full_ref).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
