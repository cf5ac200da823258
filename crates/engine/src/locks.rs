// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process run locks keyed by `(job id, fingerprint)`.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct RunLockGuard {
    key: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(job_id: &str, fingerprint: &str) -> String {
        format!("{}@{}", job_id, fingerprint)
    }

    /// `None` when another run holds the key.
    pub fn try_acquire(&self, key: &str) -> Option<RunLockGuard> {
        let mut held = self.held.lock();
        if !held.insert(key.to_string()) {
            return None;
        }
        Some(RunLockGuard {
            key: key.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}

impl RunLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.key);
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
