//! Job run specs
//!
//! Verify listing and on-demand runs, and that receipts make runs
//! idempotent.

use crate::prelude::*;

#[test]
fn list_shows_jobs_with_description() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.gitvan()
        .args(&["job", "list"])
        .passes()
        .stdout_has("build")
        .stdout_has("Build the site")
        .stdout_has("lint")
        .stdout_has("event");
}

#[test]
fn list_filters_by_tag() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.gitvan()
        .args(&["job", "list", "--tag", "ci"])
        .passes()
        .stdout_has("build")
        .stdout_lacks("Lint sources");
}

#[test]
fn empty_repository_has_no_jobs() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["job", "list", "-o", "json"])
        .passes()
        .stdout_eq("[]\n");
}

#[test]
fn run_executes_once_then_skips() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);

    repo.gitvan()
        .args(&["job", "run", "build"])
        .passes()
        .stdout_has("completed");
    assert_eq!(repo.read("out.txt").as_deref(), Some("built\n"));

    std::fs::remove_file(repo.path().join("out.txt")).unwrap();
    repo.gitvan()
        .args(&["job", "run", "build"])
        .passes()
        .stdout_has("skipped");
    assert!(repo.read("out.txt").is_none(), "skipped run must not execute");
}

#[test]
fn different_payload_is_a_new_run() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.gitvan().args(&["job", "run", "build"]).passes();
    repo.gitvan()
        .args(&["job", "run", "build", "--payload", "{\"target\":\"docs\"}"])
        .passes()
        .stdout_has("completed");
}

#[test]
fn force_runs_without_recording() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.gitvan().args(&["job", "run", "build"]).passes();
    repo.gitvan()
        .args(&["job", "run", "build", "--force"])
        .passes()
        .stdout_has("completed");

    let receipts = repo
        .gitvan()
        .args(&["receipts", "list", "--all", "-o", "json"])
        .passes()
        .json();
    assert_eq!(receipts.as_array().map(Vec::len), Some(1));
}

#[test]
fn run_records_receipt_in_git_notes() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    let runs = repo
        .gitvan()
        .args(&["job", "run", "build", "-o", "json"])
        .passes()
        .json();
    assert_eq!(runs[0]["jobId"], "build");
    assert_eq!(runs[0]["status"], "completed");

    let receipts = repo
        .gitvan()
        .args(&["receipts", "list", "--job", "build", "-o", "json"])
        .passes()
        .json();
    assert_eq!(receipts[0]["jobId"], "build");
    assert_eq!(receipts[0]["status"], "success");
    assert_eq!(receipts[0]["fingerprint"], runs[0]["fingerprint"]);

    let notes = repo.git(&["notes", "--ref=refs/notes/gitvan/results", "list"]);
    assert!(!notes.is_empty(), "receipt should be stored as a git note");
}

#[test]
fn failing_job_exits_non_zero_and_records_error() {
    let repo = Repo::new();
    repo.file(
        "jobs/broken.toml",
        "options = { retries = 0 }\n\n[[run]]\nshell = \"exit 3\"\n",
    );
    repo.gitvan()
        .args(&["job", "run", "broken"])
        .fails()
        .stdout_has("failed");
    repo.gitvan()
        .args(&["receipts", "list", "--status", "error"])
        .passes()
        .stdout_has("broken");
}
