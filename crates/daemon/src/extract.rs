// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turning ref movements into [`EventMetadata`] candidates.

use chrono::{DateTime, Utc};
use gv_adapters::{GitAdapter, GitError, RefHead, RefKind};
use gv_core::{format_iso8601, EventMetadata, PullRequest};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Upper bound on commits walked for one advanced ref in one poll.
pub const MAX_COMMITS_PER_REF: usize = 100;

#[allow(clippy::expect_used)]
static MERGE_PR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge pull request #(\d+) from (\S+)").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static MERGE_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge (remote-tracking )?branch '([^']+)'")
        .expect("constant regex pattern is valid")
});

/// Ref movements between a checkpoint and the current heads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefDiff {
    pub created_branches: Vec<RefHead>,
    /// New tags, and existing tags moved to another commit.
    pub created_tags: Vec<RefHead>,
    /// Branches whose head changed, with the previous sha.
    pub advanced: Vec<(RefHead, String)>,
    /// Full names of refs that disappeared.
    pub deleted: Vec<String>,
}

impl RefDiff {
    pub fn is_empty(&self) -> bool {
        self.created_branches.is_empty()
            && self.created_tags.is_empty()
            && self.advanced.is_empty()
            && self.deleted.is_empty()
    }
}

/// Compare checkpointed heads (keyed by full ref name) with `current`.
pub fn diff_refs(previous: &BTreeMap<String, String>, current: &[RefHead]) -> RefDiff {
    let mut diff = RefDiff::default();
    for head in current {
        match (previous.get(&head.full_name()), head.kind) {
            (None, RefKind::Branch) => diff.created_branches.push(head.clone()),
            (None, RefKind::Tag) => diff.created_tags.push(head.clone()),
            (Some(old), _) if *old == head.sha => {}
            (Some(_), RefKind::Tag) => diff.created_tags.push(head.clone()),
            (Some(old), RefKind::Branch) => diff.advanced.push((head.clone(), old.clone())),
        }
    }
    let live: Vec<String> = current.iter().map(RefHead::full_name).collect();
    diff.deleted = previous
        .keys()
        .filter(|name| !live.contains(name))
        .cloned()
        .collect();
    diff
}

/// Event candidates for one [`RefDiff`].
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub events: Vec<EventMetadata>,
    /// Branches that advanced by more than the commit limit; their oldest
    /// new commits were not turned into events.
    pub truncated: Vec<String>,
}

/// Build event candidates for a diff: tags, then created branches, then
/// the newest `max_commits` new commits of each advanced branch in
/// oldest-first order.
pub async fn extract<G: GitAdapter>(
    git: &G,
    diff: &RefDiff,
    max_commits: usize,
) -> Result<Extracted, GitError> {
    let mut events = Vec::new();
    let mut truncated = Vec::new();

    for tag in &diff.created_tags {
        let info = git.commit_info(&tag.sha).await?;
        events.push(EventMetadata {
            timestamp: timestamp(info.timestamp),
            commit: Some(tag.sha.clone()),
            tags_created: vec![tag.name.clone()],
            author_name: Some(info.author_name),
            author_email: Some(info.author_email),
            ..EventMetadata::default()
        });
    }

    for branch in &diff.created_branches {
        let info = git.commit_info(&branch.sha).await?;
        events.push(EventMetadata {
            timestamp: timestamp(info.timestamp),
            commit: Some(branch.sha.clone()),
            branch: Some(branch.name.clone()),
            branch_created: Some(branch.name.clone()),
            author_name: Some(info.author_name),
            author_email: Some(info.author_email),
            ..EventMetadata::default()
        });
    }

    for (head, old) in &diff.advanced {
        let range = format!("{}..{}", old, head.sha);
        // One extra commit tells a full window apart from a truncated one.
        let mut shas = match git.rev_list(&range, max_commits + 1).await {
            Ok(shas) => shas,
            Err(e) => {
                // Old head no longer exists (rewritten history); fall back to the tip.
                tracing::warn!(branch = %head.name, error = %e, "cannot walk range, using tip");
                vec![head.sha.clone()]
            }
        };
        if shas.len() > max_commits {
            let skipped = shas.len() - max_commits;
            shas.drain(..skipped);
            tracing::warn!(
                branch = %head.name,
                limit = max_commits,
                range = %range,
                "branch advanced past the commit limit, older commits not evaluated"
            );
            truncated.push(head.name.clone());
        }
        for sha in shas {
            events.push(commit_event(git, &sha, &head.name).await?);
        }
    }

    Ok(Extracted { events, truncated })
}

/// Metadata for one commit observed on `branch`.
pub async fn commit_event<G: GitAdapter>(
    git: &G,
    sha: &str,
    branch: &str,
) -> Result<EventMetadata, GitError> {
    let info = git.commit_info(sha).await?;
    let files = git.commit_files(sha).await?;

    let mut meta = EventMetadata {
        timestamp: timestamp(info.timestamp),
        commit: Some(info.sha.clone()),
        branch: Some(branch.to_string()),
        message: Some(info.message.trim_end().to_string()),
        author_name: Some(info.author_name.clone()),
        author_email: Some(info.author_email.clone()),
        signed: info.is_signed(),
        ..EventMetadata::default()
    };
    files.apply_to(&mut meta);

    if info.is_merge() {
        meta.merged_to = Some(branch.to_string());
        if let Some(source) = parse_merge(&info.message) {
            meta.merged_from = Some(source.from);
            meta.pull_request = source.pull_request;
        }
    }
    Ok(meta)
}

/// Where a merge commit came from, as recorded in its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub from: String,
    pub pull_request: Option<PullRequest>,
}

/// Parse `Merge branch '…'`, `Merge remote-tracking branch '…'` and
/// `Merge pull request #N from owner/branch` subjects.
pub fn parse_merge(message: &str) -> Option<MergeSource> {
    let subject = message.lines().next()?.trim();

    if let Some(caps) = MERGE_PR.captures(subject) {
        let number = caps[1].parse().ok()?;
        let source = &caps[2];
        let from = source
            .split_once('/')
            .map(|(_, branch)| branch)
            .unwrap_or(source);
        let title = message
            .lines()
            .skip(1)
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        return Some(MergeSource {
            from: from.to_string(),
            pull_request: Some(PullRequest {
                number,
                title: title.to_string(),
                state: "merged".to_string(),
            }),
        });
    }

    let caps = MERGE_BRANCH.captures(subject)?;
    let name = &caps[2];
    let from = match caps.get(1) {
        Some(_) => name.split_once('/').map(|(_, b)| b).unwrap_or(name),
        None => name,
    };
    Some(MergeSource {
        from: from.to_string(),
        pull_request: None,
    })
}

fn timestamp(secs: i64) -> String {
    format_iso8601(DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default())
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
