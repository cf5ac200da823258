// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gitvan daemon` - Daemon management commands

use crate::daemon_process::{running_pid, start_daemon_background, stop_daemon};
use crate::exit_error::{ExitError, WithKind};
use crate::output::{print_json, print_table, OutputFormat};
use crate::table::{Column, Table};
use anyhow::Result;
use clap::{Args, Subcommand};
use gv_core::Config;
use gv_daemon::{DaemonPaths, DaemonState, DaemonStatus};
use std::path::Path;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (background unless --foreground)
    Start {
        /// Run in this process until SIGTERM or Ctrl-C
        #[arg(long)]
        foreground: bool,
    },
    /// Drain and stop the daemon
    Stop,
    /// Stop and start the daemon
    Restart,
    /// Show daemon state and per-worktree counters
    Status,
    /// View the daemon log
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load_from_env().with_kind()?;
    let paths = DaemonPaths::for_root(&config.root);
    match args.command {
        DaemonCommand::Start { foreground: true } => start_foreground(config).await,
        DaemonCommand::Start { foreground: false } => start(&config, &paths, format),
        DaemonCommand::Stop => stop(&config, &paths, format).await,
        DaemonCommand::Restart => {
            stop_daemon(&paths, stop_timeout(&config)).await;
            start(&config, &paths, format)
        }
        DaemonCommand::Status => status(&paths, format),
        DaemonCommand::Logs { limit } => logs(&paths.log, limit),
    }
}

async fn start_foreground(config: Config) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        eprintln!("Draining...");
    };
    gv_daemon::serve_repository(config, shutdown, || {
        println!("Daemon running (pid {}), Ctrl-C to stop", std::process::id())
    })
    .await
    .with_kind()?;
    println!("Daemon stopped");
    Ok(())
}

fn start(config: &Config, paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    let (pid, started) = match running_pid(paths) {
        Some(pid) => (pid, false),
        None => (
            start_daemon_background(&config.root, paths, crate::env::timeout_start())?,
            true,
        ),
    };
    match format {
        OutputFormat::Text if started => println!("Daemon started (pid {})", pid),
        OutputFormat::Text => println!("Daemon already running (pid {})", pid),
        OutputFormat::Json => print_json(&serde_json::json!({
            "pid": pid,
            "started": started,
        }))?,
    }
    Ok(())
}

async fn stop(config: &Config, paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    let stopped = stop_daemon(paths, stop_timeout(config)).await;
    match format {
        OutputFormat::Text if stopped => println!("Daemon stopped"),
        OutputFormat::Text => println!("Daemon not running"),
        OutputFormat::Json => print_json(&serde_json::json!({ "stopped": stopped }))?,
    }
    Ok(())
}

/// Drain deadline plus grace, plus slack for the process to exit.
fn stop_timeout(config: &Config) -> std::time::Duration {
    config.drain_deadline() + config.grace() + crate::env::timeout_exit()
}

/// The status file, or a `stopped` placeholder when no daemon is alive.
pub fn current_status(paths: &DaemonPaths) -> Result<Option<DaemonStatus>> {
    if running_pid(paths).is_none() {
        return Ok(None);
    }
    let status = DaemonStatus::load(&paths.status).with_kind()?;
    Ok(status.filter(|s| s.state != DaemonState::Stopped))
}

fn status(paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    let Some(status) = current_status(paths)? else {
        match format {
            OutputFormat::Text => println!("Daemon not running"),
            OutputFormat::Json => print_json(&serde_json::json!({ "state": "stopped" }))?,
        }
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            println!("{} {}", crate::color::header("State:"), crate::color::status(status.state.as_str()));
            println!("Pid: {}", status.pid);
            if let Some(started) = &status.started_at {
                println!("Started: {}", started);
            }
            println!("Updated: {}", status.updated_at);
            println!();
            print_table(&worktree_table(&status), "No worktrees");
        }
        OutputFormat::Json => print_json(&status)?,
    }
    Ok(())
}

fn worktree_table(status: &DaemonStatus) -> Table {
    let mut table = Table::new(vec![
        Column::left("WORKTREE"),
        Column::right("POLLS"),
        Column::right("EVENTS"),
        Column::right("CRON"),
        Column::right("OK"),
        Column::right("SKIPPED"),
        Column::right("FAILED"),
        Column::left("LAST ERROR"),
    ]);
    for wt in &status.worktrees {
        table.row(vec![
            wt.path.display().to_string(),
            wt.polls.to_string(),
            wt.events.to_string(),
            wt.cron_ticks.to_string(),
            wt.completed.to_string(),
            wt.skipped.to_string(),
            wt.failed.to_string(),
            wt.last_error.clone().unwrap_or_default(),
        ]);
    }
    table
}

fn logs(path: &Path, limit: usize) -> Result<()> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            print!("{}", last_lines(&content, limit));
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No log file found at {}", path.display());
            Ok(())
        }
        Err(e) => Err(ExitError::new(2, format!("{}: {}", path.display(), e)).into()),
    }
}

/// The last `n` lines, newline-terminated.
fn last_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = lines[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
