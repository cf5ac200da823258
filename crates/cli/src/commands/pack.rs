// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gitvan pack` - install, apply, roll back and verify packs

use crate::exit_error::{ExitError, WithKind};
use crate::output::{print_json, print_table, short, OutputFormat};
use crate::table::{Column, Table};
use anyhow::Result;
use clap::{Args, Subcommand};
use gv_core::{Config, HookBus, PackId, SystemClock};
use gv_pack::{ApplyOutcome, Constraint, DirRegistry, PackEngine, PackError, PackSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct PackArgs {
    #[command(subcommand)]
    pub command: PackCommand,
}

#[derive(Subcommand)]
pub enum PackCommand {
    /// Resolve a pack and its dependencies from a registry and apply them
    Install {
        /// Pack id
        id: String,
        /// Version constraint, e.g. ^1.2 or ">=1.0 <2"
        #[arg(default_value = "*")]
        constraint: String,
        /// Registry directory laid out as <id>/<version>/pack.toml
        #[arg(long)]
        registry: PathBuf,
        /// Pack option as key=value (repeatable)
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Apply the pack in a local directory
    Apply {
        dir: PathBuf,
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Undo an installed pack
    Rollback {
        id: String,
        /// Show the steps without touching the worktree
        #[arg(long)]
        dry_run: bool,
    },
    /// List installed packs
    List,
    /// Check an installed pack's files against what it wrote
    Verify { id: String },
    /// Installed packs with a newer version in a registry
    Updates {
        #[arg(long)]
        registry: PathBuf,
    },
}

pub fn engine(config: &Config, hooks: HookBus) -> PackEngine<SystemClock> {
    PackEngine::for_worktree(&config.root, SystemClock, config.snapshot_retention()).with_hooks(hooks)
}

pub fn handle(
    command: PackCommand,
    config: &Config,
    hooks: HookBus,
    format: OutputFormat,
) -> Result<()> {
    let engine = engine(config, hooks);
    match command {
        PackCommand::Install {
            id,
            constraint,
            registry,
            options,
        } => {
            let constraint = Constraint::parse(&constraint)
                .map_err(PackError::from)
                .with_kind()?;
            let outcomes = engine
                .install(&DirRegistry::new(registry), &id, &constraint, &parse_options(&options)?)
                .with_kind()?;
            print_outcomes(&outcomes, format)
        }
        PackCommand::Apply { dir, options } => {
            let outcome = apply_dir(&engine, &dir, &parse_options(&options)?)?;
            print_outcomes(&[outcome], format)
        }
        PackCommand::Rollback { id, dry_run } => rollback(&engine, &PackId::new(id), dry_run, format),
        PackCommand::List => list(&engine, format),
        PackCommand::Verify { id } => verify(&engine, &PackId::new(id), format),
        PackCommand::Updates { registry } => {
            let updates = engine.updates(&DirRegistry::new(registry)).with_kind()?;
            match format {
                OutputFormat::Text => {
                    let mut table = Table::new(vec![
                        Column::left("PACK"),
                        Column::muted("CURRENT"),
                        Column::left("LATEST"),
                    ]);
                    for u in &updates {
                        table.row(vec![u.pack_id.to_string(), u.current.clone(), u.latest.clone()]);
                    }
                    print_table(&table, "All packs are up to date");
                }
                OutputFormat::Json => print_json(&updates)?,
            }
            Ok(())
        }
    }
}

/// `key=value` pairs into an option map.
pub fn parse_options(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(ExitError::new(1, format!("invalid --option {:?}: expected KEY=VALUE", pair)).into()),
        })
        .collect()
}

pub fn apply_dir(
    engine: &PackEngine<SystemClock>,
    dir: &Path,
    options: &BTreeMap<String, String>,
) -> Result<ApplyOutcome> {
    let spec = PackSpec::load(dir).with_kind()?;
    engine.apply(&spec, options).with_kind()
}

fn print_outcomes(outcomes: &[ApplyOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for outcome in outcomes {
                match outcome {
                    ApplyOutcome::Installed {
                        pack_id,
                        version,
                        artifacts,
                        ..
                    } => println!(
                        "{} {}@{} ({} file(s))",
                        crate::color::status("installed"),
                        pack_id,
                        version,
                        artifacts.len()
                    ),
                    ApplyOutcome::Skipped {
                        pack_id,
                        fingerprint,
                    } => println!(
                        "{} {} (already applied as {})",
                        crate::color::status("skipped"),
                        pack_id,
                        short(fingerprint, 12)
                    ),
                }
            }
            Ok(())
        }
        OutputFormat::Json => print_json(outcomes),
    }
}

fn rollback(
    engine: &PackEngine<SystemClock>,
    id: &PackId,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    if dry_run {
        let steps = engine.plan_rollback(id).with_kind()?;
        match format {
            OutputFormat::Text => {
                println!("Dry run - no changes made\n");
                for step in &steps {
                    println!("Would {} {}", step_verb(&step.action), step.path);
                }
            }
            OutputFormat::Json => print_json(&steps)?,
        }
        return Ok(());
    }

    let report = engine.rollback(id).with_kind()?;
    match format {
        OutputFormat::Text => {
            for step in &report.steps {
                match &step.error {
                    None => println!("{} {}", step_verb(&step.step.action), step.step.path),
                    Some(e) => println!("{} {}: {}", crate::color::status("failed"), step.step.path, e),
                }
            }
            println!("\nRolled back {} ({} step(s), {} failed)", id, report.steps.len(), report.failed());
        }
        OutputFormat::Json => print_json(&report)?,
    }
    if report.is_complete() {
        Ok(())
    } else {
        Err(ExitError::silent(2).into())
    }
}

fn step_verb(action: &gv_pack::RollbackAction) -> &'static str {
    match action {
        gv_pack::RollbackAction::Delete => "delete",
        gv_pack::RollbackAction::Restore { .. } => "restore",
    }
}

fn list(engine: &PackEngine<SystemClock>, format: OutputFormat) -> Result<()> {
    let packs = engine.list().with_kind()?;
    match format {
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::left("PACK"),
                Column::left("VERSION"),
                Column::right("FILES"),
                Column::muted("FINGERPRINT").with_max(12),
                Column::left("INSTALLED"),
            ]);
            for (id, state) in &packs {
                table.row(vec![
                    id.to_string(),
                    state.version.clone(),
                    state.artifacts.len().to_string(),
                    state.fingerprint.clone(),
                    state.installed_at.clone(),
                ]);
            }
            print_table(&table, "No packs installed");
        }
        OutputFormat::Json => print_json(&packs)?,
    }
    Ok(())
}

fn verify(engine: &PackEngine<SystemClock>, id: &PackId, format: OutputFormat) -> Result<()> {
    let report = engine.verify(id).with_kind()?;
    match format {
        OutputFormat::Text => {
            let mut table = Table::new(vec![Column::status("STATUS"), Column::left("PATH")]);
            for (status, paths) in [
                ("modified", &report.modified),
                ("missing", &report.missing),
                ("unexpected", &report.unexpected),
                ("ok", &report.ok),
            ] {
                for path in paths {
                    table.row(vec![status.to_string(), path.clone()]);
                }
            }
            print_table(&table, "No artifacts recorded");
            if report.is_clean() {
                println!("\n{} is intact", id);
            }
        }
        OutputFormat::Json => print_json(&report)?,
    }
    if report.is_clean() {
        Ok(())
    } else {
        Err(ExitError::new(1, format!("pack {} has drifted", id)).into())
    }
}

#[cfg(test)]
#[path = "pack_tests.rs"]
mod tests;
