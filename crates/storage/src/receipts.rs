// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exactly-once receipts stored as Git notes.
//!
//! Each note holds newline-delimited JSON receipts and is attached to the
//! HEAD commit at write time. The store keeps an in-memory index of
//! `(job, fingerprint) -> status` built lazily from the notes ref. A miss
//! re-lists the ref and folds in any note whose blob changed, so receipts
//! written by other processes or worktrees are seen before answering.

use gv_adapters::{GitAdapter, GitError, NoteEntry};
use gv_core::{ErrorKind, Fingerprint, JobId, Receipt, ReceiptStatus};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("cannot encode receipt: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("receipt conflict for {job_id} {fingerprint}: recorded {existing}, attempted {attempted}")]
    Conflict {
        job_id: JobId,
        fingerprint: Fingerprint,
        existing: ReceiptStatus,
        attempted: ReceiptStatus,
    },
}

impl ReceiptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReceiptError::Git(e) => e.kind(),
            ReceiptError::Encode(_) => ErrorKind::Filesystem,
            ReceiptError::Conflict { .. } => ErrorKind::ReceiptConflict,
        }
    }
}

/// What [`ReceiptStore::record`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Appended to the note on `anchor`.
    Recorded { anchor: String },
    /// An identical outcome was already recorded; nothing written.
    Duplicate,
}

/// Query for [`ReceiptStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ReceiptFilter {
    pub job_id: Option<JobId>,
    pub status: Option<ReceiptStatus>,
    pub limit: Option<usize>,
}

impl ReceiptFilter {
    fn accepts(&self, r: &Receipt) -> bool {
        self.job_id.as_ref().map_or(true, |j| *j == r.job_id)
            && self.status.map_or(true, |s| s == r.status)
    }
}

type Key = (JobId, Fingerprint);

#[derive(Default)]
struct Index {
    loaded: bool,
    entries: HashMap<Key, ReceiptStatus>,
    /// Note blob last folded in, by annotated object.
    notes: HashMap<String, String>,
}

impl Index {
    fn absorb(&mut self, entry: NoteEntry, receipts: &[Receipt]) {
        for r in receipts {
            self.entries
                .entry((r.job_id.clone(), r.fingerprint.clone()))
                .or_insert(r.status);
        }
        self.notes.insert(entry.target, entry.note);
    }
}

/// Receipt store over one worktree's notes ref.
pub struct ReceiptStore<G: GitAdapter> {
    git: G,
    notes_ref: String,
    index: Mutex<Index>,
    /// Serializes the read-append-write cycle on notes.
    write_lock: tokio::sync::Mutex<()>,
}

impl<G: GitAdapter> ReceiptStore<G> {
    pub fn new(git: G, notes_ref: impl Into<String>) -> Self {
        Self {
            git,
            notes_ref: notes_ref.into(),
            index: Mutex::new(Index::default()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn notes_ref(&self) -> &str {
        &self.notes_ref
    }

    /// Read every note on the ref.
    async fn read_all(&self) -> Result<Vec<(NoteEntry, Vec<Receipt>)>, GitError> {
        let entries = self.git.note_list(&self.notes_ref).await?;
        self.read_notes(entries).await
    }

    async fn read_notes(
        &self,
        entries: Vec<NoteEntry>,
    ) -> Result<Vec<(NoteEntry, Vec<Receipt>)>, GitError> {
        let mut notes = Vec::new();
        for entry in entries {
            if let Some(body) = self.git.note_read(&self.notes_ref, &entry.target).await? {
                let receipts = Receipt::parse_note(&body);
                notes.push((entry, receipts));
            }
        }
        Ok(notes)
    }

    /// Rebuild the index from the notes ref. Returns the number of receipts seen.
    pub async fn refresh(&self) -> Result<usize, ReceiptError> {
        let notes = self.read_all().await?;
        let mut fresh = Index {
            loaded: true,
            ..Index::default()
        };
        let mut count = 0;
        for (entry, receipts) in notes {
            count += receipts.len();
            fresh.absorb(entry, &receipts);
        }
        tracing::debug!(notes_ref = %self.notes_ref, receipts = count, "receipt index refreshed");
        *self.index.lock() = fresh;
        Ok(count)
    }

    /// Fold in notes added or rewritten since the index was last synced.
    async fn sync(&self) -> Result<(), ReceiptError> {
        if !self.index.lock().loaded {
            self.refresh().await?;
            return Ok(());
        }
        let listed = self.git.note_list(&self.notes_ref).await?;
        let stale: Vec<NoteEntry> = {
            let index = self.index.lock();
            listed
                .into_iter()
                .filter(|e| index.notes.get(&e.target) != Some(&e.note))
                .collect()
        };
        if stale.is_empty() {
            return Ok(());
        }
        let notes = self.read_notes(stale).await?;
        tracing::debug!(notes_ref = %self.notes_ref, changed = notes.len(), "receipt index synced");
        let mut index = self.index.lock();
        for (entry, receipts) in notes {
            index.absorb(entry, &receipts);
        }
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<ReceiptStatus> {
        let index = self.index.lock();
        if index.loaded {
            index.entries.get(key).copied()
        } else {
            None
        }
    }

    /// Index lookup, syncing with the notes ref on a miss.
    async fn lookup_synced(&self, key: &Key) -> Result<Option<ReceiptStatus>, ReceiptError> {
        if let Some(status) = self.lookup(key) {
            return Ok(Some(status));
        }
        self.sync().await?;
        Ok(self.lookup(key))
    }

    /// Recorded status for `(job, fingerprint)`, if any.
    pub async fn status(
        &self,
        job_id: &JobId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ReceiptStatus>, ReceiptError> {
        let key = (job_id.clone(), fingerprint.clone());
        self.lookup_synced(&key).await
    }

    pub async fn has(&self, job_id: &JobId, fingerprint: &Fingerprint) -> Result<bool, ReceiptError> {
        Ok(self.status(job_id, fingerprint).await?.is_some())
    }

    /// Idempotently record `receipt`.
    ///
    /// The same status for an existing key is a no-op; a different status
    /// fails with [`ReceiptError::Conflict`].
    pub async fn record(&self, receipt: &Receipt) -> Result<RecordOutcome, ReceiptError> {
        let _guard = self.write_lock.lock().await;

        let key = (receipt.job_id.clone(), receipt.fingerprint.clone());
        if let Some(existing) = self.lookup_synced(&key).await? {
            return self.check_existing(receipt, existing);
        }

        let anchor = self.git.head().await?;
        let mut body = self
            .git
            .note_read(&self.notes_ref, &anchor)
            .await?
            .unwrap_or_default();
        // Another process may have written since the sync above.
        if let Some(existing) = Receipt::parse_note(&body)
            .into_iter()
            .find(|r| r.job_id == receipt.job_id && r.fingerprint == receipt.fingerprint)
        {
            self.index.lock().entries.insert(key, existing.status);
            return self.check_existing(receipt, existing.status);
        }

        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&receipt.to_line()?);
        body.push('\n');
        self.git.note_write(&self.notes_ref, &anchor, &body).await?;

        self.index.lock().entries.insert(key, receipt.status);
        tracing::info!(
            job_id = %receipt.job_id,
            fingerprint = %receipt.fingerprint,
            status = %receipt.status,
            anchor = %anchor,
            "receipt recorded"
        );
        Ok(RecordOutcome::Recorded { anchor })
    }

    fn check_existing(
        &self,
        receipt: &Receipt,
        existing: ReceiptStatus,
    ) -> Result<RecordOutcome, ReceiptError> {
        if existing == receipt.status {
            Ok(RecordOutcome::Duplicate)
        } else {
            Err(ReceiptError::Conflict {
                job_id: receipt.job_id.clone(),
                fingerprint: receipt.fingerprint.clone(),
                existing,
                attempted: receipt.status,
            })
        }
    }

    /// Receipts matching `filter`, oldest first. Also refreshes the index.
    pub async fn list(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>, ReceiptError> {
        let notes = self.read_all().await?;
        let mut all: Vec<Receipt> = Vec::new();
        {
            let mut index = self.index.lock();
            for (entry, receipts) in notes {
                index.absorb(entry, &receipts);
                all.extend(receipts);
            }
            index.loaded = true;
        }
        all.retain(|r| filter.accepts(r));
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if let Some(limit) = filter.limit {
            let skip = all.len().saturating_sub(limit);
            all.drain(..skip);
        }
        Ok(all)
    }

    /// Rewrite notes dropping repeated `(job, fingerprint)` lines.
    ///
    /// The first occurrence (in note order) is kept; unrelated lines are
    /// left alone. Returns the number of lines removed.
    pub async fn compact(&self) -> Result<usize, ReceiptError> {
        let _guard = self.write_lock.lock().await;
        let mut seen: HashSet<Key> = HashSet::new();
        let mut removed = 0;
        for entry in self.git.note_list(&self.notes_ref).await? {
            let Some(body) = self.git.note_read(&self.notes_ref, &entry.target).await? else {
                continue;
            };
            let mut kept = Vec::new();
            let mut dropped = 0;
            for line in body.lines() {
                let duplicate = serde_json::from_str::<Receipt>(line.trim())
                    .map(|r| !seen.insert((r.job_id, r.fingerprint)))
                    .unwrap_or(false);
                if duplicate {
                    dropped += 1;
                } else {
                    kept.push(line);
                }
            }
            if dropped > 0 {
                let mut rewritten = kept.join("\n");
                rewritten.push('\n');
                self.git
                    .note_write(&self.notes_ref, &entry.target, &rewritten)
                    .await?;
                tracing::info!(target = %entry.target, dropped, "compacted receipt note");
                removed += dropped;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "receipts_tests.rs"]
mod tests;
