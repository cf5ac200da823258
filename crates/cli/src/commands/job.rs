// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gitvan job` - list jobs and run them on demand

use crate::exit_error::ExitError;
use crate::output::{print_json, print_table, OutputFormat};
use crate::report::{print_runs, RunView};
use crate::table::{Column, Table};
use crate::workspace::{unknown_job, Workspace};
use anyhow::Result;
use clap::{Args, Subcommand};
use gv_adapters::GitAdapter;
use gv_engine::RunRequest;
use gv_registry::{Catalog, JobDefinition};
use serde::Serialize;

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// List discovered jobs
    List {
        /// Only jobs carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Run a job now
    Run {
        /// Job id
        id: String,
        /// JSON payload passed to the job
        #[arg(long)]
        payload: Option<String>,
        /// Run even if a receipt exists, and record nothing
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle<G: GitAdapter>(
    command: JobCommand,
    ws: &Workspace<G>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        JobCommand::List { tag } => {
            let rows = job_rows(&ws.catalog(), tag.as_deref());
            match format {
                OutputFormat::Text => print_table(&job_table(&rows), "No jobs found"),
                OutputFormat::Json => print_json(&rows)?,
            }
            Ok(())
        }
        JobCommand::Run { id, payload, force } => {
            let view = run_job(ws, &id, payload.as_deref(), force).await?;
            print_runs(&[view], format, "")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: String,
    pub kind: &'static str,
    pub version: String,
    /// Cron expression, compact predicate JSON, or `-`.
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl JobRow {
    fn new(job: &JobDefinition) -> Self {
        Self {
            id: job.id.to_string(),
            kind: job.kind.as_str(),
            version: job.version().to_string(),
            trigger: trigger_summary(job),
            desc: job.meta.desc.clone(),
            tags: job.meta.tags.clone(),
        }
    }
}

pub fn trigger_summary(job: &JobDefinition) -> String {
    if let Some(cron) = &job.cron {
        return cron.as_str().to_string();
    }
    match &job.predicate {
        Some(p) => serde_json::to_string(p).unwrap_or_default(),
        None => "-".to_string(),
    }
}

pub fn job_rows(catalog: &Catalog, tag: Option<&str>) -> Vec<JobRow> {
    let mut rows: Vec<JobRow> = match tag {
        Some(tag) => catalog.with_tag(tag).map(JobRow::new).collect(),
        None => catalog.jobs().map(JobRow::new).collect(),
    };
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

fn job_table(rows: &[JobRow]) -> Table {
    let mut table = Table::new(vec![
        Column::left("ID"),
        Column::left("KIND"),
        Column::muted("VERSION"),
        Column::left("TRIGGER").with_max(48),
        Column::left("DESCRIPTION"),
    ]);
    for row in rows {
        table.row(vec![
            row.id.clone(),
            row.kind.to_string(),
            row.version.clone(),
            row.trigger.clone(),
            row.desc.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// Run `id` once with `payload` (default `{}`).
///
/// Recorded runs are keyed on the payload hash, so repeating the same payload
/// is skipped; `force` bypasses and does not record.
pub async fn run_job<G: GitAdapter>(
    ws: &Workspace<G>,
    id: &str,
    payload: Option<&str>,
    force: bool,
) -> Result<RunView> {
    let payload = match payload {
        Some(text) => serde_json::from_str(text)
            .map_err(|e| ExitError::new(1, format!("invalid --payload: {}", e)))?,
        None => serde_json::json!({}),
    };
    let catalog = ws.catalog();
    let job = catalog.job(id).ok_or_else(|| unknown_job(id))?;

    let mut req = RunRequest::on_demand(job.clone(), payload);
    if force {
        req = req.unrecorded();
    }
    let outcomes = ws.run_all(vec![req]).await?;
    match outcomes.first() {
        Some(outcome) => Ok(RunView::new(id, outcome)),
        None => Err(ExitError::new(2, "run produced no outcome").into()),
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
