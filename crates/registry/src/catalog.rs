// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery, change detection, and the indexed catalog of definitions.

use crate::definition::{
    parse_event_with_format, parse_job_with_format, EventDefinition, Format, JobDefinition,
};
use crate::find::{collect_definition_files, derive_id, predicate_from_path};
use gv_core::{content_hash, Config, HookBus, HookEvent, JobId};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Immutable view of every valid definition, indexed for the scheduler and
/// router. Jobs and events iterate in id order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    jobs: IndexMap<JobId, JobDefinition>,
    events: IndexMap<String, EventDefinition>,
    by_tag: BTreeMap<String, Vec<JobId>>,
}

impl Catalog {
    /// Build from already-resolved definitions (ids must be unique).
    pub fn from_definitions(
        mut jobs: Vec<JobDefinition>,
        mut events: Vec<EventDefinition>,
    ) -> Self {
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        events.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_tag: BTreeMap<String, Vec<JobId>> = BTreeMap::new();
        for job in &jobs {
            for tag in &job.meta.tags {
                by_tag.entry(tag.clone()).or_default().push(job.id.clone());
            }
        }

        Self {
            jobs: jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
            events: events.into_iter().map(|e| (e.id.clone(), e)).collect(),
            by_tag,
        }
    }

    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.get(id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.values()
    }

    pub fn event(&self, id: &str) -> Option<&EventDefinition> {
        self.events.get(id)
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.values()
    }

    pub fn with_tag<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a JobDefinition> + 'a {
        self.by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .filter_map(|id| self.jobs.get(id))
    }

    pub fn cron_jobs(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.values().filter(|j| j.cron.is_some())
    }

    pub fn event_jobs(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.values().filter(|j| j.compiled.is_some())
    }

    pub fn len(&self) -> usize {
        self.jobs.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.events.is_empty()
    }
}

/// Outcome of one [`Registry::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub discovered: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Files that failed to load, with the reason.
    pub invalid: Vec<(PathBuf, String)>,
    /// `(id, winner, loser)` for every duplicate id.
    pub conflicts: Vec<(String, PathBuf, PathBuf)>,
}

impl ScanReport {
    pub fn changed(&self) -> bool {
        !(self.discovered.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

#[derive(Debug, Clone)]
enum Loaded {
    Job(Box<JobDefinition>),
    Event(Box<EventDefinition>),
    Invalid(String),
}

#[derive(Debug)]
struct CachedFile {
    modified: Option<SystemTime>,
    hash: String,
    loaded: Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Jobs,
    Events,
}

/// Discovers definitions under the configured roots and keeps the
/// [`Catalog`] current.
///
/// Files are re-read only when their mtime changes and re-parsed only when
/// their content hash changes.
pub struct Registry {
    jobs_roots: Vec<PathBuf>,
    events_roots: Vec<PathBuf>,
    hooks: HookBus,
    files: HashMap<PathBuf, CachedFile>,
    conflicts: BTreeSet<(String, PathBuf, PathBuf)>,
    catalog: Arc<Catalog>,
}

impl Registry {
    pub fn new(jobs_roots: Vec<PathBuf>, events_roots: Vec<PathBuf>, hooks: HookBus) -> Self {
        Self {
            jobs_roots,
            events_roots,
            hooks,
            files: HashMap::new(),
            conflicts: BTreeSet::new(),
            catalog: Arc::new(Catalog::default()),
        }
    }

    pub fn from_config(config: &Config, hooks: HookBus) -> Self {
        Self::new(config.jobs_roots(), config.events_roots(), hooks)
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Rescan every root and publish changes.
    ///
    /// Never fails: unreadable or invalid files are reported through the
    /// hook bus and the report, and discovery continues.
    pub fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = BTreeSet::new();

        let roots: Vec<(Side, PathBuf)> = self
            .jobs_roots
            .iter()
            .map(|r| (Side::Jobs, r.clone()))
            .chain(self.events_roots.iter().map(|r| (Side::Events, r.clone())))
            .collect();

        for (side, root) in &roots {
            let files = match collect_definition_files(root) {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "cannot list definitions");
                    report.invalid.push((root.clone(), e.to_string()));
                    continue;
                }
            };
            for (path, format) in files {
                seen.insert(path.clone());
                self.refresh_file(*side, root, &path, format);
                if let Some(CachedFile {
                    loaded: Loaded::Invalid(reason),
                    ..
                }) = self.files.get(&path)
                {
                    report.invalid.push((path.clone(), reason.clone()));
                }
            }
        }
        self.files.retain(|path, _| seen.contains(path));

        let (jobs, events, conflicts) = self.resolve();
        for conflict in &conflicts {
            if !self.conflicts.contains(conflict) {
                let (id, winner, loser) = conflict;
                tracing::warn!(
                    id = %id,
                    winner = %winner.display(),
                    loser = %loser.display(),
                    "duplicate definition id"
                );
                self.hooks.emit(HookEvent::JobConflict {
                    job_id: JobId::new(id.clone()),
                    winner: winner.clone(),
                    loser: loser.clone(),
                });
            }
        }
        report.conflicts = conflicts.iter().cloned().collect();
        self.conflicts = conflicts;

        let next = Catalog::from_definitions(jobs, events);
        self.diff(&next, &mut report);
        if report.changed() {
            tracing::info!(
                jobs = next.jobs.len(),
                events = next.events.len(),
                discovered = report.discovered.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                "catalog updated"
            );
            self.catalog = Arc::new(next);
        }
        report
    }

    fn refresh_file(&mut self, side: Side, root: &Path, path: &Path, format: Format) {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        if let Some(cached) = self.files.get(path) {
            if modified.is_some() && cached.modified == modified {
                return;
            }
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                self.store_invalid(path, modified, String::new(), e.to_string());
                return;
            }
        };
        let hash = content_hash(content.as_bytes());
        if let Some(cached) = self.files.get_mut(path) {
            if cached.hash == hash {
                cached.modified = modified;
                return;
            }
        }

        let id = derive_id(root, path);
        let loaded = match side {
            Side::Jobs => parse_job_with_format(&content, format, &id, path)
                .map(|j| Loaded::Job(Box::new(j))),
            Side::Events => {
                let implied = predicate_from_path(root, path);
                parse_event_with_format(&content, format, &id, path, implied)
                    .map(|e| Loaded::Event(Box::new(e)))
            }
        };
        match loaded {
            Ok(loaded) => {
                self.files.insert(
                    path.to_path_buf(),
                    CachedFile {
                        modified,
                        hash,
                        loaded,
                    },
                );
            }
            Err(e) => self.store_invalid(path, modified, hash, e.to_string()),
        }
    }

    fn store_invalid(
        &mut self,
        path: &Path,
        modified: Option<SystemTime>,
        hash: String,
        reason: String,
    ) {
        tracing::warn!(path = %path.display(), error = %reason, "skipping invalid definition");
        self.hooks.emit(HookEvent::JobValidate {
            source: path.to_path_buf(),
            error: reason.clone(),
        });
        self.files.insert(
            path.to_path_buf(),
            CachedFile {
                modified,
                hash,
                loaded: Loaded::Invalid(reason),
            },
        );
    }

    /// Pick one definition per id: higher priority wins, then the
    /// lexicographically smaller source path.
    #[allow(clippy::type_complexity)]
    fn resolve(
        &self,
    ) -> (
        Vec<JobDefinition>,
        Vec<EventDefinition>,
        BTreeSet<(String, PathBuf, PathBuf)>,
    ) {
        let mut jobs: BTreeMap<String, Vec<&JobDefinition>> = BTreeMap::new();
        let mut events: BTreeMap<String, Vec<&EventDefinition>> = BTreeMap::new();
        for cached in self.files.values() {
            match &cached.loaded {
                Loaded::Job(j) => jobs.entry(j.id.to_string()).or_default().push(j),
                Loaded::Event(e) => events
                    .entry(format!("event:{}", e.id))
                    .or_default()
                    .push(e),
                Loaded::Invalid(_) => {}
            }
        }

        let mut conflicts = BTreeSet::new();
        let mut pick = |key: &str, candidates: Vec<(u8, &Path)>| -> usize {
            let mut order: Vec<usize> = (0..candidates.len()).collect();
            order.sort_by(|&a, &b| {
                candidates[b]
                    .0
                    .cmp(&candidates[a].0)
                    .then_with(|| candidates[a].1.cmp(candidates[b].1))
            });
            let winner = order[0];
            for &loser in &order[1..] {
                conflicts.insert((
                    key.to_string(),
                    candidates[winner].1.to_path_buf(),
                    candidates[loser].1.to_path_buf(),
                ));
            }
            winner
        };

        let jobs = jobs
            .into_iter()
            .map(|(id, defs)| {
                let i = pick(
                    &id,
                    defs.iter().map(|d| (d.priority(), d.source.as_path())).collect(),
                );
                defs[i].clone()
            })
            .collect();
        let events = events
            .into_iter()
            .map(|(key, defs)| {
                let i = pick(
                    &key,
                    defs.iter().map(|d| (d.priority, d.source.as_path())).collect(),
                );
                defs[i].clone()
            })
            .collect();
        (jobs, events, conflicts)
    }

    fn diff(&self, next: &Catalog, report: &mut ScanReport) {
        let prev = &self.catalog;
        for job in next.jobs() {
            match prev.job(job.id.as_str()) {
                None => {
                    report.discovered.push(job.id.to_string());
                    self.hooks.emit(HookEvent::JobDiscovered {
                        job_id: job.id.clone(),
                        source: job.source.clone(),
                    });
                }
                Some(old) if old.content_hash != job.content_hash || old.source != job.source => {
                    report.updated.push(job.id.to_string());
                    self.hooks.emit(HookEvent::JobUpdated {
                        job_id: job.id.clone(),
                        source: job.source.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        for event in next.events() {
            let key = format!("event:{}", event.id);
            match prev.event(&event.id) {
                None => {
                    report.discovered.push(key.clone());
                    self.hooks.emit(HookEvent::JobDiscovered {
                        job_id: JobId::new(key),
                        source: event.source.clone(),
                    });
                }
                Some(old)
                    if old.content_hash != event.content_hash || old.source != event.source =>
                {
                    report.updated.push(key.clone());
                    self.hooks.emit(HookEvent::JobUpdated {
                        job_id: JobId::new(key),
                        source: event.source.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        for job in prev.jobs() {
            if next.job(job.id.as_str()).is_none() {
                report.removed.push(job.id.to_string());
                self.hooks.emit(HookEvent::JobRemoved {
                    job_id: job.id.clone(),
                });
            }
        }
        for event in prev.events() {
            if next.event(&event.id).is_none() {
                let key = format!("event:{}", event.id);
                report.removed.push(key.clone());
                self.hooks.emit(HookEvent::JobRemoved {
                    job_id: JobId::new(key),
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
