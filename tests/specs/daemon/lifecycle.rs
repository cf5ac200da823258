//! Daemon lifecycle specs
//!
//! Verify start/stop/status and that a running daemon reacts to commits.

use crate::prelude::*;

fn status_text(repo: &Repo) -> String {
    repo.gitvan().args(&["daemon", "status"]).passes().stdout()
}

fn receipt_count(repo: &Repo) -> usize {
    repo.gitvan()
        .args(&["receipts", "list", "--all", "-o", "json"])
        .passes()
        .json()
        .as_array()
        .map_or(0, Vec::len)
}

#[test]
fn status_without_daemon_reports_not_running() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["daemon", "status"])
        .passes()
        .stdout_eq("Daemon not running\n");
}

#[test]
fn stop_without_daemon_is_harmless() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn start_status_stop() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");

    let running = wait_for(SPEC_WAIT_MAX_MS, || status_text(&repo).contains("State: running"));
    assert!(running, "daemon never reported running\n{}", repo.daemon_log());

    repo.gitvan()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("already running");

    repo.gitvan()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
    assert_eq!(status_text(&repo), "Daemon not running\n");
}

#[test]
fn running_daemon_fires_job_for_new_commit() {
    let repo = Repo::new();
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.commit("add lint job");
    repo.gitvan().args(&["daemon", "start"]).passes();

    // The first poll only records a baseline
    let polled = wait_for(SPEC_WAIT_MAX_MS, || {
        repo.path().join(".gitvan/state/checkpoint.json").exists()
    });
    assert!(polled, "no checkpoint written\n{}", repo.daemon_log());
    assert_eq!(receipt_count(&repo), 0);

    repo.file("src/app.js", "console.log(1)\n");
    repo.commit("touch src");
    let fired = wait_for(SPEC_WAIT_MAX_MS, || receipt_count(&repo) == 1);
    assert!(fired, "lint never ran\n{}", repo.daemon_log());

    repo.gitvan().args(&["daemon", "stop"]).passes();
    assert_eq!(receipt_count(&repo), 1);
}

#[test]
fn logs_show_startup() {
    let repo = Repo::new();
    repo.gitvan().args(&["daemon", "start"]).passes();
    repo.gitvan().args(&["daemon", "stop"]).passes();
    repo.gitvan()
        .args(&["daemon", "logs", "-n", "500"])
        .passes()
        .stdout_has("gitvand: starting");
}
