// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Repo;
use chrono::TimeZone;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, h, m, 20).unwrap()
}

fn repo() -> Repo {
    let repo = Repo::new();
    repo.write(
        "jobs/nightly.toml",
        "cron = \"0 3 * * *\"\n\n[meta]\ndesc = \"Nightly report\"\n\n[[run]]\nshell = \"true\"\n",
    )
    .write("jobs/often.toml", "cron = \"*/15 * * * *\"\n\n[[run]]\nshell = \"true\"\n")
    .write("jobs/manual.toml", "[[run]]\nshell = \"true\"\n");
    repo
}

#[test]
fn list_shows_next_due_minute() {
    let repo = repo();
    let rows = cron_rows(&repo.workspace().catalog(), at(2, 50));

    assert_eq!(
        rows,
        vec![
            CronRow {
                id: "nightly".into(),
                schedule: "0 3 * * *".into(),
                next: Some("2026-03-01T03:00Z".into()),
                desc: Some("Nightly report".into()),
            },
            CronRow {
                id: "often".into(),
                schedule: "*/15 * * * *".into(),
                next: Some("2026-03-01T03:00Z".into()),
                desc: None,
            },
        ]
    );
}

#[tokio::test]
async fn tick_runs_only_jobs_due_that_minute() {
    let repo = repo();
    let runs = tick(&repo.workspace(), at(3, 15)).await.unwrap();

    let ids: Vec<&str> = runs.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(ids, vec!["often"]);
    assert_eq!(runs[0].status, "completed");
}

#[tokio::test]
async fn repeated_tick_for_same_minute_is_skipped() {
    let repo = repo();
    let ws = repo.workspace();
    let first = tick(&ws, at(3, 0)).await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|r| r.status == "completed"));

    let again = tick(&ws, at(3, 0)).await.unwrap();
    assert!(again.iter().all(|r| r.status == "skipped"));
    assert_eq!(repo.receipts().len(), 2);
}

#[tokio::test]
async fn quiet_minute_runs_nothing() {
    let repo = repo();
    assert!(tick(&repo.workspace(), at(3, 7)).await.unwrap().is_empty());
}
