//! CLI error handling specs
//!
//! Verify error messages and exit codes for bad input.

use crate::prelude::*;

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let repo = Repo::bare_dir();
    repo.gitvan()
        .args(&["frobnicate"])
        .exits(2)
        .stderr_has("unrecognized subcommand");
}

#[test]
fn unknown_job_exits_one() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["job", "run", "nope"])
        .exits(1)
        .stderr_has("unknown job: nope");
}

#[test]
fn malformed_payload_exits_one() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.gitvan()
        .args(&["job", "run", "build", "--payload", "{not json"])
        .exits(1)
        .stderr_has("invalid --payload");
}

#[test]
fn malformed_cron_minute_exits_one() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["cron", "tick", "--at", "yesterday"])
        .exits(1)
        .stderr_has("expected YYYY-MM-DDTHH:MMZ");
}

#[test]
fn unknown_config_key_exits_one() {
    let repo = Repo::new();
    repo.file("gitvan.toml", "no_such_setting = true\n");
    repo.gitvan().args(&["job", "list"]).exits(1);
}

#[test]
fn invalid_definition_is_reported_but_not_fatal() {
    let repo = Repo::new();
    repo.file("jobs/build.toml", BUILD_JOB);
    repo.file("jobs/broken.toml", "cron = \"not a schedule\"\n");
    repo.gitvan()
        .args(&["job", "list"])
        .passes()
        .stdout_has("build")
        .stdout_lacks("broken");
}
