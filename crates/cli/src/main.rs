// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gitvan - Git-native job automation

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;
mod report;
mod table;
#[cfg(test)]
mod test_helpers;
mod workspace;

use output::OutputFormat;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{cron, daemon, event, job, pack, receipts};
use workspace::Workspace;

#[derive(Parser)]
#[command(
    name = "gitvan",
    version,
    about = "GitVan - jobs, events and packs driven by your git history"
)]
pub(crate) struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Job definitions and on-demand runs
    Job(job::JobArgs),
    /// Cron schedules
    Cron(cron::CronArgs),
    /// Event bindings and commit simulation
    Event(event::EventArgs),
    /// Pack installation and rollback
    Pack(pack::PackArgs),
    /// Execution receipts
    Receipts(receipts::ReceiptsArgs),
}

pub(crate) fn cli_command() -> clap::Command {
    Cli::command()
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Warnings and above on stderr unless `GITVAN_LOG` says otherwise.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_new(gv_daemon::env::log_filter("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Format an anyhow error, dropping causes the top-level message already
/// includes.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // The daemon manages its own process and config loading
    let command = match command {
        Commands::Daemon(args) => return daemon::daemon(args, format).await,
        other => other,
    };

    let ws = Workspace::from_env()?;
    match command {
        Commands::Job(args) => job::handle(args.command, &ws, format).await,
        Commands::Cron(args) => cron::handle(args.command, &ws, format).await,
        Commands::Event(args) => event::handle(args.command, &ws, format).await,
        Commands::Pack(args) => pack::handle(args.command, &ws.config, ws.hooks.clone(), format),
        Commands::Receipts(args) => receipts::handle(args.command, &ws, format).await,
        Commands::Daemon(args) => daemon::daemon(args, format).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
