//! Cron specs
//!
//! Verify schedule listing and single-minute evaluation.

use crate::prelude::*;

#[test]
fn list_shows_next_due_minute() {
    let repo = Repo::new();
    repo.file("jobs/nightly.toml", NIGHTLY_JOB);
    let rows = repo
        .gitvan()
        .args(&["cron", "list", "-o", "json"])
        .passes()
        .json();
    assert_eq!(rows[0]["id"], "nightly");
    assert_eq!(rows[0]["schedule"], "15 3 * * *");
    let next = rows[0]["next"].as_str().unwrap();
    assert!(next.ends_with("T03:15Z"), "unexpected next minute {next}");
}

#[test]
fn tick_runs_only_due_jobs() {
    let repo = Repo::new();
    repo.file("jobs/nightly.toml", NIGHTLY_JOB);
    repo.file("jobs/build.toml", BUILD_JOB);

    repo.gitvan()
        .args(&["cron", "tick", "--at", "2026-03-01T03:15Z"])
        .passes()
        .stdout_has("nightly")
        .stdout_has("completed")
        .stdout_lacks("build");
}

#[test]
fn quiet_minute_runs_nothing() {
    let repo = Repo::new();
    repo.file("jobs/nightly.toml", NIGHTLY_JOB);
    repo.gitvan()
        .args(&["cron", "tick", "--at", "2026-03-01T03:16Z"])
        .passes()
        .stdout_has("No cron jobs due");
}

#[test]
fn repeated_tick_for_same_minute_is_skipped() {
    let repo = Repo::new();
    repo.file("jobs/nightly.toml", NIGHTLY_JOB);
    let args = ["cron", "tick", "--at", "2026-03-01T03:15Z"];
    repo.gitvan().args(&args).passes().stdout_has("completed");
    repo.gitvan().args(&args).passes().stdout_has("skipped");
}
