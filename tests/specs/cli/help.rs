//! CLI help specs
//!
//! Verify top-level help and version output.

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help() {
    let repo = Repo::bare_dir();
    repo.gitvan()
        .passes()
        .stdout_has("Usage: gitvan")
        .stdout_has("daemon")
        .stdout_has("receipts");
}

#[test]
fn help_lists_every_command_group() {
    let repo = Repo::bare_dir();
    let out = repo.gitvan().args(&["--help"]).passes().stdout();
    for group in ["daemon", "job", "cron", "event", "pack", "receipts"] {
        assert!(out.contains(group), "help is missing {group}:\n{out}");
    }
}

#[test]
fn version_flag_prints_name() {
    let repo = Repo::bare_dir();
    repo.gitvan()
        .args(&["--version"])
        .passes()
        .stdout_has("gitvan ");
}

#[test]
fn subcommand_help_shows_options() {
    let repo = Repo::bare_dir();
    repo.gitvan()
        .args(&["pack", "install", "--help"])
        .passes()
        .stdout_has("--registry")
        .stdout_has("--option");
}
