// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event metadata: a snapshot of one candidate trigger observed in Git.

use serde::{Deserialize, Serialize};

/// Pull request record attached to merge commits created by a PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
}

/// Everything a predicate may look at for one candidate trigger.
///
/// `files_changed` is the union of added, modified, deleted, and renamed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default)]
    pub files_added: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub files_deleted: Vec<String>,
    #[serde(default)]
    pub tags_created: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default)]
    pub signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequest>,
}

impl EventMetadata {
    /// Rebuild `files_changed` as the sorted, de-duplicated union of the
    /// added/modified/deleted sets plus anything already present.
    pub fn normalize_files(&mut self) {
        let mut all: Vec<String> = self
            .files_changed
            .iter()
            .chain(&self.files_added)
            .chain(&self.files_modified)
            .chain(&self.files_deleted)
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        self.files_changed = all;
    }

    /// Ref that produced this event when it is not the commit itself.
    ///
    /// Tag and branch creations can point at a commit that already fired,
    /// so they carry their ref name into run fingerprints.
    pub fn origin(&self) -> Option<String> {
        if !self.tags_created.is_empty() {
            return Some(format!("tag:{}", self.tags_created.join(",")));
        }
        self.branch_created
            .as_ref()
            .map(|branch| format!("branch:{}", branch))
    }

    /// Short description used in logs.
    pub fn describe(&self) -> String {
        if let Some(tag) = self.tags_created.first() {
            return format!("tag {}", tag);
        }
        match (&self.commit, &self.branch) {
            (Some(c), Some(b)) => format!("{}@{}", b, &c[..c.len().min(8)]),
            (Some(c), None) => c[..c.len().min(8)].to_string(),
            (None, Some(b)) => b.clone(),
            (None, None) => "event".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
