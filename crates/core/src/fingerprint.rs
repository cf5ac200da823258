// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed execution fingerprints.
//!
//! A fingerprint is `sha256(jobId \0 jobVersion \0 canonical(trigger))`,
//! rendered as lowercase hex. The trigger is serialized with a fixed field
//! order so the value is stable across processes and platforms.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// What caused an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Trigger {
    /// A cron tick for one UTC minute (`YYYY-MM-DDTHH:MMZ`).
    Cron {
        #[serde(rename = "minuteUTC")]
        minute_utc: String,
    },
    /// A Git event anchored on a commit, matched by a named predicate.
    Event {
        commit: String,
        #[serde(rename = "matcherKey")]
        matcher_key: String,
    },
    /// An explicit invocation keyed on the payload hash.
    OnDemand {
        #[serde(rename = "payloadHash")]
        payload_hash: String,
    },
}

impl Trigger {
    pub fn on_demand(payload: &serde_json::Value) -> Self {
        Trigger::OnDemand {
            payload_hash: payload_hash(payload),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Cron { .. } => "cron",
            Trigger::Event { .. } => "event",
            Trigger::OnDemand { .. } => "on-demand",
        }
    }

    /// Commit the trigger is anchored on, if any.
    pub fn commit(&self) -> Option<&str> {
        match self {
            Trigger::Event { commit, .. } => Some(commit),
            _ => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Cron { minute_utc } => write!(f, "cron minuteUTC={}", minute_utc),
            Trigger::Event {
                commit,
                matcher_key,
            } => write!(f, "event {}@{}", matcher_key, &commit[..commit.len().min(8)]),
            Trigger::OnDemand { payload_hash } => {
                write!(f, "on-demand {}", &payload_hash[..payload_hash.len().min(12)])
            }
        }
    }
}

/// Hex SHA-256 identifying one execution's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Compute the fingerprint of `(job_id, version, trigger)`.
pub fn fingerprint(job_id: &str, version: &str, trigger: &Trigger) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(version.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_trigger(trigger).as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn canonical_trigger(trigger: &Trigger) -> String {
    match trigger {
        Trigger::Cron { minute_utc } => format!("cron|{}", minute_utc),
        Trigger::Event {
            commit,
            matcher_key,
        } => format!("event|{}|{}", commit, matcher_key),
        Trigger::OnDemand { payload_hash } => format!("on-demand|{}", payload_hash),
    }
}

/// Hex SHA-256 of raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex SHA-256 of a JSON value in canonical (sorted-key) form.
pub fn payload_hash(payload: &serde_json::Value) -> String {
    // serde_json::Map is ordered by key, so to_string is canonical.
    content_hash(payload.to_string().as_bytes())
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
