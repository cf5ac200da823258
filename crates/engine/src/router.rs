// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps observed Git events to job runs.

use crate::runner::RunRequest;
use gv_core::{EventMetadata, JobKind, JobMeta, Trigger};
use gv_registry::{Catalog, EventAction, EventDefinition, JobAction, JobDefinition};
use std::collections::HashSet;

/// Matcher key for a job's own `on` predicate.
pub fn job_matcher(job_id: &str) -> String {
    format!("job:{}", job_id)
}

/// Matcher key for an event definition.
pub fn event_matcher(event_id: &str) -> String {
    format!("event:{}", event_id)
}

/// `base` scoped to the ref that produced `meta`, if any.
fn scoped(base: String, meta: &EventMetadata) -> String {
    match meta.origin() {
        Some(origin) => format!("{}#{}", base, origin),
        None => base,
    }
}

/// Runs triggered by `meta`.
///
/// Jobs whose own predicate matches come first, then event definitions by
/// descending priority. An event bound to a job that already matched on its
/// own predicate adds nothing.
pub fn route(catalog: &Catalog, meta: &EventMetadata) -> Vec<RunRequest> {
    let commit = meta.commit.clone().unwrap_or_default();
    let payload = serde_json::to_value(meta).unwrap_or_default();
    let mut requests = Vec::new();
    let mut matched: HashSet<String> = HashSet::new();

    for job in catalog.event_jobs() {
        let Some(compiled) = &job.compiled else { continue };
        if !compiled.evaluate(meta) {
            continue;
        }
        matched.insert(job.id.to_string());
        requests.push(RunRequest::new(
            job.clone(),
            Trigger::Event {
                commit: commit.clone(),
                matcher_key: scoped(job_matcher(job.id.as_str()), meta),
            },
            payload.clone(),
        ));
    }

    let mut events: Vec<&EventDefinition> = catalog
        .events()
        .filter(|e| e.compiled.evaluate(meta))
        .collect();
    events.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

    for event in events {
        let job = match &event.action {
            EventAction::Job(job_id) => {
                if matched.contains(job_id.as_str()) {
                    continue;
                }
                let Some(job) = catalog.job(job_id.as_str()) else {
                    tracing::warn!(event = %event.id, job_id = %job_id, "event names an unknown job");
                    continue;
                };
                matched.insert(job_id.to_string());
                job.clone()
            }
            EventAction::Steps(steps) => inline_job(event, steps.clone()),
        };
        requests.push(RunRequest::new(
            job,
            Trigger::Event {
                commit: commit.clone(),
                matcher_key: scoped(event_matcher(&event.id), meta),
            },
            payload.clone(),
        ));
    }

    tracing::debug!(event = %meta.describe(), runs = requests.len(), "routed event");
    requests
}

/// A job wrapping an event definition's inline steps.
fn inline_job(event: &EventDefinition, steps: Vec<gv_registry::StepDef>) -> JobDefinition {
    let mut meta = JobMeta::new();
    meta.desc = event.desc.clone();
    meta.priority = event.priority;
    JobDefinition {
        id: event_matcher(&event.id).into(),
        kind: JobKind::Event,
        cron: None,
        predicate: Some(event.predicate.clone()),
        compiled: Some(event.compiled.clone()),
        meta,
        options: Default::default(),
        action: JobAction::Steps(steps),
        source: event.source.clone(),
        content_hash: event.content_hash.clone(),
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
