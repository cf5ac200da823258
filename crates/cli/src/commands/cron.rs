// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron command handlers

use crate::exit_error::ExitError;
use crate::output::{print_json, print_table, OutputFormat};
use crate::report::{print_runs, RunView};
use crate::table::{Column, Table};
use crate::workspace::Workspace;
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use gv_adapters::GitAdapter;
use gv_core::{format_minute, parse_minute, Clock, HookEvent, SystemClock};
use gv_engine::CronWheel;
use gv_registry::Catalog;
use serde::Serialize;

#[derive(Args)]
pub struct CronArgs {
    #[command(subcommand)]
    pub command: CronCommand,
}

#[derive(Subcommand)]
pub enum CronCommand {
    /// List cron jobs and their next run
    List,
    /// Evaluate one minute and run the jobs due in it
    Tick {
        /// UTC minute to evaluate, e.g. 2026-03-01T12:00Z (default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

pub async fn handle<G: GitAdapter>(
    command: CronCommand,
    ws: &Workspace<G>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        CronCommand::List => {
            let rows = cron_rows(&ws.catalog(), SystemClock.utc());
            match format {
                OutputFormat::Text => print_table(&cron_table(&rows), "No cron jobs found"),
                OutputFormat::Json => print_json(&rows)?,
            }
            Ok(())
        }
        CronCommand::Tick { at } => {
            let minute = match at {
                Some(text) => parse_minute(&text).ok_or_else(|| {
                    ExitError::new(1, format!("invalid --at {:?}: expected YYYY-MM-DDTHH:MMZ", text))
                })?,
                None => SystemClock.utc(),
            };
            let runs = tick(ws, minute).await?;
            print_runs(&runs, format, "No cron jobs due")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRow {
    pub id: String,
    pub schedule: String,
    /// Next due minute after now, `YYYY-MM-DDTHH:MMZ`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

pub fn cron_rows(catalog: &Catalog, now: DateTime<Utc>) -> Vec<CronRow> {
    let mut rows: Vec<CronRow> = catalog
        .cron_jobs()
        .filter_map(|job| {
            let expr = job.cron.as_ref()?;
            Some(CronRow {
                id: job.id.to_string(),
                schedule: expr.as_str().to_string(),
                next: expr.next_after(now).map(format_minute),
                desc: job.meta.desc.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

fn cron_table(rows: &[CronRow]) -> Table {
    let mut table = Table::new(vec![
        Column::left("ID"),
        Column::left("SCHEDULE"),
        Column::left("NEXT"),
        Column::left("DESCRIPTION"),
    ]);
    for row in rows {
        table.row(vec![
            row.id.clone(),
            row.schedule.clone(),
            row.next.clone().unwrap_or_else(|| "-".to_string()),
            row.desc.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// Run every cron job due in the minute containing `now`.
///
/// Runs carry the same fingerprint the daemon would use for that minute, so
/// a minute the daemon already handled is skipped.
pub async fn tick<G: GitAdapter>(ws: &Workspace<G>, now: DateTime<Utc>) -> Result<Vec<RunView>> {
    let catalog = ws.catalog();
    let ticks = CronWheel::new(1).advance(now, &catalog);
    if let Some(first) = ticks.first() {
        ws.hooks.emit(HookEvent::CronTick {
            minute_utc: first.minute_utc(),
            jobs: ticks.iter().map(|t| t.job_id.clone()).collect(),
        });
    }

    let (ids, requests): (Vec<String>, Vec<_>) = ticks
        .iter()
        .filter_map(|t| Some((t.job_id.to_string(), t.request(&catalog)?)))
        .unzip();
    let outcomes = ws.run_all(requests).await?;
    Ok(ids
        .iter()
        .zip(&outcomes)
        .map(|(id, outcome)| RunView::new(id, outcome))
        .collect())
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
