// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gitvan event` - inspect event bindings and replay commits through them

use crate::exit_error::WithKind;
use crate::output::{print_json, print_table, short, OutputFormat};
use crate::report::{print_runs, RunView};
use crate::table::{Column, Table};
use crate::workspace::Workspace;
use anyhow::Result;
use clap::{Args, Subcommand};
use gv_adapters::GitAdapter;
use gv_core::EventMetadata;
use gv_daemon::extract::commit_event;
use gv_engine::{route, RunRequest};
use gv_registry::{Catalog, EventAction};
use serde::Serialize;

#[derive(Args)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommand,
}

#[derive(Subcommand)]
pub enum EventCommand {
    /// List event-triggered jobs and event definitions
    List,
    /// Route a commit's metadata through the predicates
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
pub struct SimulateArgs {
    /// Commit to describe (default: HEAD)
    #[arg(long)]
    pub commit: Option<String>,
    /// Branch the commit was seen on (default: current branch)
    #[arg(long)]
    pub branch: Option<String>,
    /// Replace the changed files (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<String>,
    /// Treat these tags as created
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Replace the commit message
    #[arg(long)]
    pub message: Option<String>,
    /// Treat the commit as a merge into this branch
    #[arg(long)]
    pub merged_to: Option<String>,
    /// Source branch of the merge
    #[arg(long)]
    pub merged_from: Option<String>,
    /// Treat this branch as just created
    #[arg(long)]
    pub branch_created: Option<String>,
    #[arg(long)]
    pub author_email: Option<String>,
    /// Treat the commit as signed
    #[arg(long)]
    pub signed: bool,
    /// Execute the matched jobs instead of listing them
    #[arg(long)]
    pub run: bool,
}

pub async fn handle<G: GitAdapter>(
    command: EventCommand,
    ws: &Workspace<G>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        EventCommand::List => {
            let rows = binding_rows(&ws.catalog());
            match format {
                OutputFormat::Text => print_table(&binding_table(&rows), "No event bindings found"),
                OutputFormat::Json => print_json(&rows)?,
            }
            Ok(())
        }
        EventCommand::Simulate(args) => {
            let run = args.run;
            let meta = simulated_metadata(ws, args).await?;
            let requests = route(&ws.catalog(), &meta);
            if run {
                let ids: Vec<String> = requests.iter().map(|r| r.job.id.to_string()).collect();
                let outcomes = ws.run_all(requests).await?;
                let runs: Vec<RunView> = ids
                    .iter()
                    .zip(&outcomes)
                    .map(|(id, o)| RunView::new(id, o))
                    .collect();
                return print_runs(&runs, format, "No jobs matched");
            }
            let matches: Vec<MatchRow> = requests.iter().map(MatchRow::new).collect();
            match format {
                OutputFormat::Text => {
                    println!("{} {}", crate::color::header("Event:"), meta.describe());
                    print_table(&match_table(&matches), "No jobs matched");
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "metadata": meta,
                    "matches": matches,
                }))?,
            }
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRow {
    pub id: String,
    /// `job` for a job's own `on`, `event` for an event definition.
    pub source: &'static str,
    /// Job id, or `(inline)` for event steps.
    pub runs: String,
    pub priority: u8,
    pub predicate: String,
}

pub fn binding_rows(catalog: &Catalog) -> Vec<BindingRow> {
    let mut rows: Vec<BindingRow> = catalog
        .event_jobs()
        .map(|job| BindingRow {
            id: job.id.to_string(),
            source: "job",
            runs: job.id.to_string(),
            priority: job.priority(),
            predicate: super::job::trigger_summary(job),
        })
        .collect();
    let mut events: Vec<BindingRow> = catalog
        .events()
        .map(|event| BindingRow {
            id: event.id.clone(),
            source: "event",
            runs: match &event.action {
                EventAction::Job(id) => id.to_string(),
                EventAction::Steps(_) => "(inline)".to_string(),
            },
            priority: event.priority,
            predicate: serde_json::to_string(&event.predicate).unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    events.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    rows.extend(events);
    rows
}

fn binding_table(rows: &[BindingRow]) -> Table {
    let mut table = Table::new(vec![
        Column::left("ID"),
        Column::muted("SOURCE"),
        Column::left("RUNS"),
        Column::right("PRIORITY"),
        Column::left("PREDICATE"),
    ]);
    for row in rows {
        table.row(vec![
            row.id.clone(),
            row.source.to_string(),
            row.runs.clone(),
            row.priority.to_string(),
            row.predicate.clone(),
        ]);
    }
    table
}

/// Metadata of `--commit` (or HEAD) with the flag overrides applied.
pub async fn simulated_metadata<G: GitAdapter>(
    ws: &Workspace<G>,
    args: SimulateArgs,
) -> Result<EventMetadata> {
    let sha = match args.commit {
        Some(sha) => sha,
        None => ws.git.head().await.with_kind()?,
    };
    let branch = match args.branch {
        Some(branch) => branch,
        None => ws.git.current_branch().await.with_kind()?,
    };
    let mut meta = commit_event(&ws.git, &sha, &branch).await.with_kind()?;

    if !args.files.is_empty() {
        meta.files_changed = args.files;
        meta.files_added.clear();
        meta.files_modified.clear();
        meta.files_deleted.clear();
    }
    if !args.tags.is_empty() {
        meta.tags_created = args.tags;
    }
    if let Some(message) = args.message {
        meta.message = Some(message);
    }
    if let Some(to) = args.merged_to {
        meta.merged_to = Some(to);
    }
    if let Some(from) = args.merged_from {
        meta.merged_from = Some(from);
    }
    if let Some(created) = args.branch_created {
        meta.branch_created = Some(created);
    }
    if let Some(email) = args.author_email {
        meta.author_email = Some(email);
    }
    meta.signed |= args.signed;
    meta.normalize_files();
    Ok(meta)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRow {
    pub job_id: String,
    pub trigger: String,
    pub fingerprint: String,
}

impl MatchRow {
    fn new(req: &RunRequest) -> Self {
        Self {
            job_id: req.job.id.to_string(),
            trigger: req.trigger.to_string(),
            fingerprint: req.fingerprint().to_string(),
        }
    }
}

fn match_table(rows: &[MatchRow]) -> Table {
    let mut table = Table::new(vec![
        Column::left("JOB"),
        Column::left("TRIGGER"),
        Column::muted("FINGERPRINT"),
    ]);
    for row in rows {
        table.row(vec![
            row.job_id.clone(),
            row.trigger.clone(),
            short(&row.fingerprint, 12).to_string(),
        ]);
    }
    table
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
