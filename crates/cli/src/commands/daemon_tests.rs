// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::FromArgMatches;

fn parse(args: &[&str]) -> DaemonCommand {
    let matches = crate::cli_command().try_get_matches_from(args).unwrap();
    match crate::Cli::from_arg_matches(&matches).unwrap().command {
        Some(crate::Commands::Daemon(args)) => args.command,
        _ => panic!("expected daemon command"),
    }
}

#[test]
fn start_defaults_to_background() {
    assert!(matches!(
        parse(&["gitvan", "daemon", "start"]),
        DaemonCommand::Start { foreground: false }
    ));
    assert!(matches!(
        parse(&["gitvan", "daemon", "start", "--foreground"]),
        DaemonCommand::Start { foreground: true }
    ));
}

#[test]
fn logs_limit_defaults_to_fifty() {
    assert!(matches!(
        parse(&["gitvan", "daemon", "logs"]),
        DaemonCommand::Logs { limit: 50 }
    ));
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(crate::cli_command()
        .try_get_matches_from(["gitvan", "daemon"])
        .is_err());
}

#[yare::parameterized(
    fewer_than_limit = { "a\nb\n", 5, "a\nb\n" },
    trims_to_limit   = { "a\nb\nc\n", 2, "b\nc\n" },
    empty            = { "", 3, "" },
)]
fn last_lines_keeps_tail(content: &str, n: usize, expected: &str) {
    assert_eq!(last_lines(content, n), expected);
}

#[test]
fn status_without_pid_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    assert!(current_status(&paths).unwrap().is_none());
}

#[test]
fn status_of_live_daemon_is_read_from_status_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    std::fs::create_dir_all(paths.pid.parent().unwrap()).unwrap();
    // Any live pid will do for the liveness probe
    std::fs::write(&paths.pid, std::process::id().to_string()).unwrap();
    let status = DaemonStatus {
        pid: std::process::id(),
        state: DaemonState::Running,
        started_at: Some("2026-03-01T12:00:00.000Z".into()),
        worktrees: vec![gv_daemon::WorktreeStatus {
            path: dir.path().to_path_buf(),
            polls: 4,
            ..Default::default()
        }],
        updated_at: "2026-03-01T12:00:08.000Z".into(),
    };
    status.save(&paths.status).unwrap();

    let loaded = current_status(&paths).unwrap().unwrap();
    assert_eq!(loaded.state, DaemonState::Running);
    assert_eq!(loaded.worktrees[0].polls, 4);
    assert!(!worktree_table(&loaded).is_empty());
}

#[test]
fn stopped_status_file_reads_as_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    std::fs::create_dir_all(paths.pid.parent().unwrap()).unwrap();
    std::fs::write(&paths.pid, std::process::id().to_string()).unwrap();
    DaemonStatus {
        pid: std::process::id(),
        state: DaemonState::Stopped,
        started_at: None,
        worktrees: vec![],
        updated_at: "2026-03-01T12:00:08.000Z".into(),
    }
    .save(&paths.status)
    .unwrap();

    assert!(current_status(&paths).unwrap().is_none());
}
