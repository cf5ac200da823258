//! Event simulation specs
//!
//! Verify routing of commit metadata to jobs and event definitions.

use crate::prelude::*;

const DOCS_JOB: &str = r#"
[[run]]
shell = "echo docs > out.txt"
"#;

/// The predicate comes from the path: `merge-to/main` fires on merges into main.
const MERGE_TO_MAIN: &str = "job = \"docs\"\n";

#[test]
fn list_shows_job_and_event_bindings() {
    let repo = Repo::new();
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.file("jobs/docs.toml", DOCS_JOB);
    repo.file("events/merge-to/main.toml", MERGE_TO_MAIN);
    let rows = repo
        .gitvan()
        .args(&["event", "list", "-o", "json"])
        .passes()
        .json();
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["lint", "merge-to.main"]);
    assert_eq!(rows[1]["runs"], "docs");
}

#[test]
fn head_commit_touching_src_matches_lint() {
    let repo = Repo::new();
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.file("src/app.js", "console.log(1)\n");
    let sha = repo.commit("add app");

    repo.gitvan()
        .args(&["event", "simulate"])
        .passes()
        .stdout_has(&format!("main@{}", &sha[..8]))
        .stdout_has("lint");
}

#[test]
fn unrelated_files_match_nothing() {
    let repo = Repo::new();
    repo.file("jobs/lint.toml", LINT_JOB);
    repo.gitvan()
        .args(&["event", "simulate", "--files", "docs/guide.md"])
        .passes()
        .stdout_has("No jobs matched");
}

#[test]
fn simulated_merge_routes_through_event_definition() {
    let repo = Repo::new();
    repo.file("jobs/docs.toml", DOCS_JOB);
    repo.file("events/merge-to/main.toml", MERGE_TO_MAIN);
    repo.commit("add docs job");

    repo.gitvan()
        .args(&["event", "simulate", "--merged-to", "main", "--run"])
        .passes()
        .stdout_has("docs")
        .stdout_has("completed");
    assert_eq!(repo.read("out.txt").as_deref(), Some("docs\n"));
}
