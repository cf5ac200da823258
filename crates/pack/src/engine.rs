// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applying packs to a worktree.
//!
//! Every file a batch touches is snapshotted before its first change, so a
//! failed batch restores the worktree and an installed pack can be rolled
//! back later from the artifacts recorded in `packs.json`.

use crate::constraint::{is_update_available, Constraint};
use crate::error::PackError;
use crate::registry::PackRegistry;
use crate::resolve::resolve_id;
use crate::spec::{validate_path, PackSpec, Transform};
use crate::version::Version;
use gv_core::{content_hash, format_iso8601, Clock, HookBus, HookEvent, IdGen, PackId, SnapshotId, UlidGen};
use gv_registry::interpolate;
use gv_storage::{
    ArtifactChange, OperationKind, PackArtifact, PackOperation, PackState, PackStateFile,
    PackStateStore, SnapshotStore,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of one [`PackEngine::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApplyOutcome {
    Installed {
        pack_id: PackId,
        version: String,
        fingerprint: String,
        artifacts: Vec<PackArtifact>,
    },
    Skipped {
        pack_id: PackId,
        fingerprint: String,
    },
}

impl ApplyOutcome {
    pub fn pack_id(&self) -> &PackId {
        match self {
            ApplyOutcome::Installed { pack_id, .. } | ApplyOutcome::Skipped { pack_id, .. } => {
                pack_id
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ApplyOutcome::Installed { .. } => "installed",
            ApplyOutcome::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RollbackAction {
    /// Remove a file the pack created.
    Delete,
    /// Put back the pre-apply content.
    Restore { snapshot: SnapshotId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackStep {
    pub path: String,
    #[serde(flatten)]
    pub action: RollbackAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    #[serde(flatten)]
    pub step: RollbackStep,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub pack_id: PackId,
    pub steps: Vec<StepResult>,
}

impl RollbackReport {
    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }
}

/// Integrity of an installed pack's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub ok: Vec<String>,
    /// Present with a different hash than recorded.
    pub modified: Vec<String>,
    /// Recorded as written but gone.
    pub missing: Vec<String>,
    /// Deleted by the pack but present again.
    pub unexpected: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.missing.is_empty() && self.unexpected.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub pack_id: PackId,
    pub current: String,
    pub latest: String,
}

/// A file touched by the running batch.
struct Touched {
    path: String,
    /// Pre-image; `None` when the file did not exist.
    snapshot: Option<SnapshotId>,
}

pub struct PackEngine<C: Clock, I: IdGen = UlidGen> {
    worktree: PathBuf,
    snapshots: SnapshotStore<I>,
    state: PackStateStore,
    hooks: HookBus,
    clock: C,
    retention: Duration,
}

impl<C: Clock> PackEngine<C, UlidGen> {
    pub fn for_worktree(worktree: &Path, clock: C, retention: Duration) -> Self {
        Self::new(
            worktree,
            SnapshotStore::for_worktree(worktree),
            PackStateStore::for_worktree(worktree),
            clock,
            retention,
        )
    }
}

impl<C: Clock, I: IdGen> PackEngine<C, I> {
    pub fn new(
        worktree: &Path,
        snapshots: SnapshotStore<I>,
        state: PackStateStore,
        clock: C,
        retention: Duration,
    ) -> Self {
        Self {
            worktree: worktree.to_path_buf(),
            snapshots,
            state,
            hooks: HookBus::new(),
            clock,
            retention,
        }
    }

    pub fn with_hooks(mut self, hooks: HookBus) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// Apply `spec` with `options` at most once per fingerprint.
    ///
    /// A pack installed under a different fingerprint is rolled back first.
    pub fn apply(
        &self,
        spec: &PackSpec,
        options: &BTreeMap<String, String>,
    ) -> Result<ApplyOutcome, PackError> {
        let options = spec.resolve_options(options)?;
        let fingerprint = spec.fingerprint(&options);
        let version = spec.version.to_string();

        let mut state = self.state.load()?;
        if let Some(installed) = state.get(&spec.id) {
            if installed.fingerprint == fingerprint {
                tracing::info!(pack_id = %spec.id, %version, "pack already applied, skipping");
                self.log_op(&mut state, OperationKind::Skip, &spec.id, &version, true, None);
                self.save(&mut state)?;
                self.hooks.emit(HookEvent::PackSkipped {
                    pack_id: spec.id.clone(),
                    fingerprint: fingerprint.clone(),
                });
                return Ok(ApplyOutcome::Skipped {
                    pack_id: spec.id.clone(),
                    fingerprint,
                });
            }
            tracing::info!(
                pack_id = %spec.id,
                from = %installed.version,
                to = %version,
                "replacing installed pack"
            );
            let report = self.rollback(&spec.id)?;
            if !report.is_complete() {
                return Err(PackError::RollbackIncomplete {
                    pack_id: spec.id.clone(),
                    failed: report.failed(),
                });
            }
            state = self.state.load()?;
        }

        let transforms = render(spec, &options)?;
        let touched = match self.run_batch(spec, &transforms) {
            Ok(touched) => touched,
            Err(e) => {
                let detail = e.to_string();
                self.log_op(&mut state, OperationKind::Apply, &spec.id, &version, false, Some(detail));
                self.save(&mut state)?;
                return Err(e);
            }
        };

        let artifacts = self.artifacts(&touched)?;
        state.packs.insert(
            spec.id.clone(),
            PackState {
                version: version.clone(),
                fingerprint: fingerprint.clone(),
                installed_at: format_iso8601(self.clock.utc()),
                artifacts: artifacts.clone(),
            },
        );
        self.log_op(&mut state, OperationKind::Apply, &spec.id, &version, true, None);
        self.save(&mut state)?;
        tracing::info!(pack_id = %spec.id, %version, artifacts = artifacts.len(), "pack applied");
        self.hooks.emit(HookEvent::PackApplied {
            pack_id: spec.id.clone(),
            version: version.clone(),
            fingerprint: fingerprint.clone(),
        });
        self.prune(&state);

        Ok(ApplyOutcome::Installed {
            pack_id: spec.id.clone(),
            version,
            fingerprint,
            artifacts,
        })
    }

    /// Resolve `id` against `registry` and apply the whole closure, leaves
    /// first. `options` go to the requested pack; dependencies get defaults.
    pub fn install<R: PackRegistry + ?Sized>(
        &self,
        registry: &R,
        id: &str,
        constraint: &Constraint,
        options: &BTreeMap<String, String>,
    ) -> Result<Vec<ApplyOutcome>, PackError> {
        let resolution = resolve_id(registry, id, constraint)?;
        tracing::info!(pack = id, order = ?resolution.summary(), "resolved pack dependencies");
        let none = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(resolution.order.len());
        for spec in &resolution.order {
            let opts = if spec.id.as_str() == id { options } else { &none };
            outcomes.push(self.apply(spec, opts)?);
        }
        Ok(outcomes)
    }

    /// Reverse operations for an installed pack, last artifact first.
    pub fn plan_rollback(&self, id: &PackId) -> Result<Vec<RollbackStep>, PackError> {
        let state = self.state.load()?;
        let installed = state
            .get(id)
            .ok_or_else(|| PackError::NotInstalled(id.clone()))?;
        Ok(plan(&installed.artifacts))
    }

    /// Undo an installed pack. Step failures are reported, not thrown; the
    /// pack stays recorded with only the artifacts that could not be undone.
    pub fn rollback(&self, id: &PackId) -> Result<RollbackReport, PackError> {
        let mut state = self.state.load()?;
        let installed = state
            .get(id)
            .cloned()
            .ok_or_else(|| PackError::NotInstalled(id.clone()))?;

        let mut results = Vec::new();
        for step in plan(&installed.artifacts) {
            let outcome = self.undo(&step);
            if let Err(e) = &outcome {
                tracing::warn!(pack_id = %id, path = %step.path, error = %e, "rollback step failed");
            }
            results.push(StepResult {
                ok: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
                step,
            });
        }
        let report = RollbackReport {
            pack_id: id.clone(),
            steps: results,
        };

        if report.is_complete() {
            state.packs.remove(id);
        } else if let Some(entry) = state.packs.get_mut(id) {
            let failed: Vec<&str> = report
                .steps
                .iter()
                .filter(|s| !s.ok)
                .map(|s| s.step.path.as_str())
                .collect();
            entry.artifacts.retain(|a| failed.contains(&a.path.as_str()));
        }
        let detail = (!report.is_complete()).then(|| format!("{} step(s) failed", report.failed()));
        self.log_op(
            &mut state,
            OperationKind::Rollback,
            id,
            &installed.version,
            report.is_complete(),
            detail,
        );
        self.save(&mut state)?;
        tracing::info!(pack_id = %id, steps = report.steps.len(), failed = report.failed(), "pack rolled back");
        self.hooks.emit(HookEvent::PackRolledBack {
            pack_id: id.clone(),
            failed_steps: report.failed(),
        });
        Ok(report)
    }

    /// Compare each recorded artifact against the worktree.
    pub fn verify(&self, id: &PackId) -> Result<VerifyReport, PackError> {
        let state = self.state.load()?;
        let installed = state
            .get(id)
            .ok_or_else(|| PackError::NotInstalled(id.clone()))?;

        let mut report = VerifyReport::default();
        for artifact in &installed.artifacts {
            let current = self.read_optional(&artifact.path)?;
            let path = artifact.path.clone();
            match (artifact.change, current) {
                (ArtifactChange::Deleted, None) => report.ok.push(path),
                (ArtifactChange::Deleted, Some(_)) => report.unexpected.push(path),
                (_, None) => report.missing.push(path),
                (_, Some(bytes)) => {
                    if artifact.hash.as_deref() == Some(content_hash(&bytes).as_str()) {
                        report.ok.push(path);
                    } else {
                        report.modified.push(path);
                    }
                }
            }
        }
        Ok(report)
    }

    pub fn list(&self) -> Result<BTreeMap<PackId, PackState>, PackError> {
        Ok(self.state.load()?.packs)
    }

    /// Installed packs with a newer non-prerelease version in `registry`.
    pub fn updates<R: PackRegistry + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<Vec<UpdateInfo>, PackError> {
        let any = Constraint::parse("*")?;
        let mut updates = Vec::new();
        for (id, installed) in self.state.load()?.packs {
            let current = Version::parse(&installed.version)?;
            let candidates = registry.versions(id.as_str())?;
            if let Some(latest) = is_update_available(&current, &candidates, &any) {
                updates.push(UpdateInfo {
                    latest: latest.to_string(),
                    current: installed.version,
                    pack_id: id,
                });
            }
        }
        Ok(updates)
    }

    fn run_batch(&self, spec: &PackSpec, transforms: &[Transform]) -> Result<Vec<Touched>, PackError> {
        let mut touched: Vec<Touched> = Vec::new();
        for (index, transform) in transforms.iter().enumerate() {
            let path = transform.path();
            let result = self
                .capture_once(&mut touched, path)
                .and_then(|()| self.execute(transform));
            if let Err(e) = result {
                let rollback_failures = self.undo_batch(&touched);
                tracing::warn!(
                    pack_id = %spec.id,
                    index,
                    path,
                    error = %e,
                    rollback_failures,
                    "transform failed, batch rolled back"
                );
                return Err(PackError::Transform {
                    pack_id: spec.id.clone(),
                    index,
                    path: path.to_string(),
                    message: e.to_string(),
                    rollback_failures,
                });
            }
        }
        Ok(touched)
    }

    /// Snapshot `path` the first time the batch touches it.
    fn capture_once(&self, touched: &mut Vec<Touched>, path: &str) -> Result<(), PackError> {
        if touched.iter().any(|t| t.path == path) {
            return Ok(());
        }
        let snapshot = match self.read_optional(path)? {
            Some(bytes) => Some(self.snapshots.capture(path, &bytes, self.clock.utc())?.id),
            None => None,
        };
        touched.push(Touched {
            path: path.to_string(),
            snapshot,
        });
        Ok(())
    }

    fn execute(&self, transform: &Transform) -> Result<(), PackError> {
        let target = self.worktree.join(transform.path());
        match transform {
            Transform::Write { content, .. } => write_file(&target, content.as_bytes()),
            Transform::Create { content, .. } => {
                if target.exists() {
                    return Err(PackError::invalid(transform.path(), "already exists"));
                }
                write_file(&target, content.as_bytes())
            }
            Transform::Append { content, .. } => {
                ensure_parent(&target)?;
                let mut file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&target)
                    .map_err(|e| PackError::io(&target, e))?;
                file.write_all(content.as_bytes())
                    .map_err(|e| PackError::io(&target, e))
            }
            Transform::Delete { .. } => match fs::remove_file(&target) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = transform.path(), "delete target already absent");
                    Ok(())
                }
                Err(e) => Err(PackError::io(&target, e)),
            },
            Transform::JsonMerge { value, .. } => {
                let mut doc = match self.read_optional(transform.path())? {
                    Some(bytes) => serde_json::from_slice::<Value>(&bytes).map_err(|e| {
                        PackError::invalid(transform.path(), format!("not valid JSON: {}", e))
                    })?,
                    None => Value::Object(Default::default()),
                };
                if !doc.is_object() {
                    return Err(PackError::invalid(transform.path(), "not a JSON object"));
                }
                merge_json(&mut doc, value);
                let mut text = serde_json::to_string_pretty(&doc)
                    .map_err(|e| PackError::invalid(transform.path(), e.to_string()))?;
                text.push('\n');
                write_file(&target, text.as_bytes())
            }
        }
    }

    /// Restore every file of an aborted batch. Returns the failure count.
    fn undo_batch(&self, touched: &[Touched]) -> usize {
        touched
            .iter()
            .rev()
            .map(|t| RollbackStep {
                path: t.path.clone(),
                action: match &t.snapshot {
                    Some(id) => RollbackAction::Restore { snapshot: id.clone() },
                    None => RollbackAction::Delete,
                },
            })
            .filter(|step| match self.undo(step) {
                Ok(()) => false,
                Err(e) => {
                    tracing::error!(path = %step.path, error = %e, "could not restore file");
                    true
                }
            })
            .count()
    }

    fn undo(&self, step: &RollbackStep) -> Result<(), PackError> {
        let target = self.worktree.join(&step.path);
        match &step.action {
            RollbackAction::Delete => match fs::remove_file(&target) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(PackError::io(&target, e)),
            },
            RollbackAction::Restore { snapshot } => {
                let bytes = self.snapshots.read(snapshot)?;
                write_file(&target, &bytes)
            }
        }
    }

    fn artifacts(&self, touched: &[Touched]) -> Result<Vec<PackArtifact>, PackError> {
        let mut artifacts = Vec::with_capacity(touched.len());
        for t in touched {
            let current = self.read_optional(&t.path)?;
            let change = match (&t.snapshot, &current) {
                (None, Some(_)) => ArtifactChange::Created,
                (Some(_), Some(_)) => ArtifactChange::Modified,
                (Some(_), None) => ArtifactChange::Deleted,
                (None, None) => continue,
            };
            artifacts.push(PackArtifact::file(
                t.path.clone(),
                change,
                current.map(|b| content_hash(&b)),
                t.snapshot.clone(),
            ));
        }
        Ok(artifacts)
    }

    fn read_optional(&self, path: &str) -> Result<Option<Vec<u8>>, PackError> {
        let target = self.worktree.join(path);
        match fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PackError::io(target, e)),
        }
    }

    fn log_op(
        &self,
        state: &mut PackStateFile,
        op: OperationKind,
        id: &PackId,
        version: &str,
        ok: bool,
        detail: Option<String>,
    ) {
        state.log(PackOperation {
            op,
            pack_id: id.clone(),
            version: version.to_string(),
            at: format_iso8601(self.clock.utc()),
            ok,
            detail,
        });
    }

    fn save(&self, state: &mut PackStateFile) -> Result<(), PackError> {
        let now = format_iso8601(self.clock.utc());
        Ok(self.state.save(state, &now)?)
    }

    fn prune(&self, state: &PackStateFile) {
        let keep = state.referenced_snapshots();
        if let Err(e) = self.snapshots.prune(self.retention, self.clock.utc(), &keep) {
            tracing::warn!(error = %e, "snapshot pruning failed");
        }
    }
}

/// Interpolate options into every transform path and text.
fn render(spec: &PackSpec, options: &BTreeMap<String, String>) -> Result<Vec<Transform>, PackError> {
    let mut rendered = Vec::with_capacity(spec.transforms.len());
    for (i, t) in spec.transforms.iter().enumerate() {
        let path = interpolate(t.path(), options);
        validate_path(&format!("transforms[{}]", i), &path)?;
        rendered.push(match t {
            Transform::Write { content, .. } => Transform::Write {
                path,
                content: interpolate(content, options),
            },
            Transform::Create { content, .. } => Transform::Create {
                path,
                content: interpolate(content, options),
            },
            Transform::Append { content, .. } => Transform::Append {
                path,
                content: interpolate(content, options),
            },
            Transform::Delete { .. } => Transform::Delete { path },
            Transform::JsonMerge { value, .. } => Transform::JsonMerge {
                path,
                value: value.clone(),
            },
        });
    }
    Ok(rendered)
}

fn plan(artifacts: &[PackArtifact]) -> Vec<RollbackStep> {
    artifacts
        .iter()
        .rev()
        .filter_map(|a| {
            let action = match (a.change, &a.snapshot) {
                (ArtifactChange::Created, _) => RollbackAction::Delete,
                (_, Some(id)) => RollbackAction::Restore { snapshot: id.clone() },
                (_, None) => {
                    tracing::warn!(path = %a.path, "artifact has no snapshot, cannot restore");
                    return None;
                }
            };
            Some(RollbackStep {
                path: a.path.clone(),
                action,
            })
        })
        .collect()
}

/// Objects merge key by key; anything else is replaced.
pub(crate) fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn ensure_parent(path: &Path) -> Result<(), PackError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e)),
        None => Ok(()),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PackError> {
    ensure_parent(path)?;
    fs::write(path, bytes).map_err(|e| PackError::io(path, e))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
