// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printing job run outcomes.

use crate::exit_error::ExitError;
use crate::output::{print_json, short, OutputFormat};
use crate::table::{Column, Table};
use gv_core::ErrorKind;
use gv_engine::RunOutcome;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub job_id: String,
    pub status: &'static str,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl RunView {
    pub fn new(job_id: &str, outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed { receipt, result, .. } => Self {
                job_id: job_id.to_string(),
                status: "completed",
                fingerprint: receipt.fingerprint.to_string(),
                duration_ms: Some(result.duration_ms),
                artifacts: result.artifacts.clone(),
                error: None,
                error_kind: None,
            },
            RunOutcome::Skipped { fingerprint, reason } => Self {
                job_id: job_id.to_string(),
                status: "skipped",
                fingerprint: fingerprint.to_string(),
                duration_ms: None,
                artifacts: Vec::new(),
                error: Some(reason.clone()).filter(|r| !r.is_empty()),
                error_kind: None,
            },
            RunOutcome::Failed { receipt, error, .. } => Self {
                job_id: job_id.to_string(),
                status: "failed",
                fingerprint: receipt.fingerprint.to_string(),
                duration_ms: Some(receipt.duration),
                artifacts: Vec::new(),
                error: Some(error.to_string()),
                error_kind: Some(error.kind()),
            },
        }
    }
}

/// Print runs; exits non-zero when any run failed.
pub fn print_runs(runs: &[RunView], format: OutputFormat, empty: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::left("JOB"),
                Column::status("STATUS"),
                Column::muted("FINGERPRINT").with_max(12),
                Column::right("DURATION"),
                Column::left("DETAIL"),
            ]);
            for run in runs {
                table.row(vec![
                    run.job_id.clone(),
                    run.status.to_string(),
                    short(&run.fingerprint, 12).to_string(),
                    run.duration_ms
                        .map(|ms| format!("{}ms", ms))
                        .unwrap_or_else(|| "-".to_string()),
                    run.error.clone().unwrap_or_default(),
                ]);
            }
            crate::output::print_table(&table, empty);
        }
        OutputFormat::Json => print_json(runs)?,
    }
    match failure_code(runs) {
        Some(code) => Err(ExitError::silent(code).into()),
        None => Ok(()),
    }
}

/// Exit code of the first failed run.
pub fn failure_code(runs: &[RunView]) -> Option<i32> {
    runs.iter()
        .find(|r| r.status == "failed")
        .map(|r| r.error_kind.unwrap_or(ErrorKind::User).exit_code())
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
