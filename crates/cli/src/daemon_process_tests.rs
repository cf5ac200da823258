// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn current_process_exists() {
    assert!(process_exists(std::process::id()));
}

#[test]
fn no_pid_file_means_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    assert_eq!(running_pid(&paths), None);
}

#[test]
fn stale_pid_is_not_running_and_gets_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    std::fs::create_dir_all(paths.pid.parent().unwrap()).unwrap();
    // Reap a short-lived child so its pid is known to be dead
    let mut child = Command::new("true").spawn().unwrap();
    let dead = child.id();
    child.wait().unwrap();
    std::fs::write(&paths.pid, format!("{}\n", dead)).unwrap();

    assert_eq!(running_pid(&paths), None);
    cleanup_stale_pid(&paths);
    assert!(!paths.pid.exists());
}

#[tokio::test]
async fn stop_without_daemon_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    assert!(!stop_daemon(&paths, Duration::from_millis(100)).await);
}

#[test]
fn startup_error_comes_from_daemon_log() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DaemonPaths::for_root(dir.path());
    gv_daemon::logging::write_startup_marker(&paths.log).unwrap();
    gv_daemon::logging::write_startup_error(&paths.log, &"not a git repository");

    assert_eq!(
        read_startup_error(&paths).as_deref(),
        Some("not a git repository")
    );
}
