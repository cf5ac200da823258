// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gitvan receipts` - read execution receipts from git notes

use crate::exit_error::WithKind;
use crate::output::{print_json, print_table, short, OutputFormat};
use crate::table::{Column, Table};
use crate::workspace::Workspace;
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use gv_adapters::GitAdapter;
use gv_core::{JobId, Receipt, ReceiptStatus};
use gv_storage::ReceiptFilter;

#[derive(Args)]
pub struct ReceiptsArgs {
    #[command(subcommand)]
    pub command: ReceiptsCommand,
}

#[derive(Subcommand)]
pub enum ReceiptsCommand {
    /// List receipts, oldest first
    List {
        /// Only receipts for this job
        #[arg(long)]
        job: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Keep only the newest N
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Show every receipt (ignores --limit)
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Success,
    Error,
}

impl From<StatusArg> for ReceiptStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Success => ReceiptStatus::Success,
            StatusArg::Error => ReceiptStatus::Error,
        }
    }
}

pub async fn handle<G: GitAdapter>(
    command: ReceiptsCommand,
    ws: &Workspace<G>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ReceiptsCommand::List {
            job,
            status,
            limit,
            all,
        } => {
            let filter = ReceiptFilter {
                job_id: job.map(JobId::new),
                status: status.map(ReceiptStatus::from),
                limit: (!all).then_some(limit),
            };
            let receipts = list(ws, &filter).await?;
            match format {
                OutputFormat::Text => print_table(&receipts_table(&receipts), "No receipts found"),
                OutputFormat::Json => print_json(&receipts)?,
            }
            Ok(())
        }
    }
}

pub async fn list<G: GitAdapter>(ws: &Workspace<G>, filter: &ReceiptFilter) -> Result<Vec<Receipt>> {
    ws.receipts().list(filter).await.with_kind()
}

fn receipts_table(receipts: &[Receipt]) -> Table {
    let mut table = Table::new(vec![
        Column::muted("TIME"),
        Column::left("JOB"),
        Column::status("STATUS"),
        Column::right("DURATION"),
        Column::muted("FINGERPRINT"),
        Column::left("ERROR").with_max(48),
    ]);
    for r in receipts {
        table.row(vec![
            r.timestamp.clone(),
            r.job_id.to_string(),
            r.status.to_string(),
            format!("{}ms", r.duration),
            short(&r.fingerprint.0, 12).to_string(),
            r.error.clone().unwrap_or_default(),
        ]);
    }
    table
}

#[cfg(test)]
#[path = "receipts_tests.rs"]
mod tests;
