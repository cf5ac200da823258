// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use gv_adapters::FakeGit;
use gv_core::test_support::RecordingSink;
use gv_core::{FakeClock, Receipt, ReceiptStatus, DEFAULT_NOTES_REF};
use std::time::Duration;
use tempfile::TempDir;

const LINT_JOB: &str = r#"
on = { pathChanged = ["src/**/*.js"] }

[[run]]
shell = "true"
"#;

struct Harness {
    dir: TempDir,
    git: FakeGit,
    clock: FakeClock,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new(dir.path());
        git.commit("initial", &["README.md"]);
        let clock = FakeClock::at(chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 30).unwrap());
        Self {
            dir,
            git,
            clock,
            sink: Arc::new(RecordingSink::default()),
        }
    }

    fn job(&self, id: &str, content: &str) -> &Self {
        let path = self.dir.path().join("jobs").join(format!("{}.toml", id));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    fn worktree_loop(&self) -> WorktreeLoop<FakeGit, FakeClock> {
        let hooks = HookBus::new();
        hooks.subscribe(self.sink.clone());
        let deps = LoopDeps {
            handlers: HandlerRegistry::new(),
            hooks,
            locks: RunLocks::new(),
            drain: CancelToken::never(),
        };
        WorktreeLoop::new(
            &Config::for_root(self.dir.path()),
            self.git.clone(),
            deps,
            self.clock.clone(),
        )
        .unwrap()
    }

    fn receipts(&self) -> Vec<Receipt> {
        self.git
            .notes(DEFAULT_NOTES_REF)
            .values()
            .flat_map(|body| Receipt::parse_note(body))
            .collect()
    }
}

#[tokio::test]
async fn first_poll_records_baseline_without_firing() {
    let h = Harness::new();
    h.job("lint", LINT_JOB);
    h.git.commit("add app", &["src/app.js"]);
    let mut wt = h.worktree_loop();

    let report = wt.poll_once().await.unwrap();

    assert!(report.baseline);
    assert_eq!(report.events, 0);
    assert_eq!(report.dispatched, 0);
    let checkpoint = Checkpoint::load(h.dir.path()).unwrap().unwrap();
    assert_eq!(
        checkpoint.head("refs/heads/main"),
        h.git.head_sha().as_deref()
    );
    assert_eq!(
        checkpoint.last_cron_minute.as_deref(),
        Some("2026-03-01T12:00Z")
    );
}

#[tokio::test]
async fn path_changed_job_fires_once_per_commit() {
    let h = Harness::new();
    h.job("lint", LINT_JOB);
    let mut wt = h.worktree_loop();
    wt.poll_once().await.unwrap();

    let sha = h.git.commit("touch app", &["src/app.js"]);
    let report = wt.poll_once().await.unwrap();
    assert_eq!(report.events, 1);
    assert_eq!(report.completed, 1);

    let receipts = h.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].job_id.as_str(), "lint");
    assert_eq!(receipts[0].status, ReceiptStatus::Success);
    assert!(h.git.notes(DEFAULT_NOTES_REF).contains_key(&sha));

    let again = wt.poll_once().await.unwrap();
    assert_eq!(again.events, 0);
    assert_eq!(again.dispatched, 0);
    assert_eq!(h.receipts().len(), 1);
}

#[tokio::test]
async fn unmatched_commit_dispatches_nothing() {
    let h = Harness::new();
    h.job("lint", LINT_JOB);
    let mut wt = h.worktree_loop();
    wt.poll_once().await.unwrap();

    h.git.commit("docs", &["docs/guide.md"]);
    let report = wt.poll_once().await.unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.dispatched, 0);
    assert!(h.receipts().is_empty());
}

#[tokio::test]
async fn restarted_loop_resumes_from_checkpoint() {
    let h = Harness::new();
    h.job("lint", LINT_JOB);
    h.worktree_loop().poll_once().await.unwrap();

    h.git.commit("one", &["src/a.js"]);
    h.git.commit("two", &["src/b.js"]);
    let report = h.worktree_loop().poll_once().await.unwrap();

    assert!(!report.baseline);
    assert_eq!(report.events, 2);
    assert_eq!(report.completed, 2);
}

#[tokio::test]
async fn replay_after_lost_checkpoint_is_skipped_by_receipts() {
    let h = Harness::new();
    h.job("lint", LINT_JOB);
    let mut wt = h.worktree_loop();
    wt.poll_once().await.unwrap();
    let before = Checkpoint::load(h.dir.path()).unwrap().unwrap();

    h.git.commit("touch", &["src/app.js"]);
    wt.poll_once().await.unwrap();

    // Roll the checkpoint back as if the save had never happened
    before.save(h.dir.path()).unwrap();
    let report = h.worktree_loop().poll_once().await.unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(h.receipts().len(), 1);
}

#[tokio::test]
async fn cron_job_runs_once_per_minute() {
    let h = Harness::new();
    h.job("heartbeat", "cron = \"* * * * *\"\n\n[[run]]\nshell = \"true\"\n");
    let mut wt = h.worktree_loop();

    wt.poll_once().await.unwrap();

    h.clock.advance(Duration::from_secs(60));
    let first = wt.poll_once().await.unwrap();
    assert_eq!(first.cron_ticks, 1);
    assert_eq!(first.completed, 1);

    let same_minute = wt.poll_once().await.unwrap();
    assert_eq!(same_minute.cron_ticks, 0);

    h.clock.advance(Duration::from_secs(60));
    let next = wt.poll_once().await.unwrap();
    assert_eq!(next.cron_ticks, 1);
    assert_eq!(next.completed, 1);

    assert_eq!(h.sink.count("cron:tick"), 2);
    assert_eq!(h.receipts().len(), 2);
}

#[tokio::test]
async fn baseline_poll_does_not_fire_cron() {
    let h = Harness::new();
    h.job("heartbeat", "cron = \"* * * * *\"\n\n[[run]]\nshell = \"true\"\n");
    let mut wt = h.worktree_loop();

    let report = wt.poll_once().await.unwrap();

    assert!(report.baseline);
    assert_eq!(report.cron_ticks, 0);
    assert_eq!(report.dispatched, 0);
    assert_eq!(h.sink.count("cron:tick"), 0);
    assert!(h.receipts().is_empty());
    let checkpoint = Checkpoint::load(h.dir.path()).unwrap().unwrap();
    assert_eq!(
        checkpoint.last_cron_minute.as_deref(),
        Some("2026-03-01T12:00Z")
    );
}

#[tokio::test]
async fn failing_job_is_counted_and_loop_continues() {
    let h = Harness::new();
    h.job(
        "broken",
        r#"
on = { pathChanged = ["**"] }
options = { retries = 0 }

[[run]]
shell = "exit 3"
"#,
    );
    let mut wt = h.worktree_loop();
    wt.poll_once().await.unwrap();

    h.git.commit("anything", &["x.txt"]);
    let report = wt.poll_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.receipts()[0].status, ReceiptStatus::Error);

    assert_eq!(wt.status().failed, 1);
    assert_eq!(wt.status().polls, 2);
    assert!(wt.status().last_error.is_none());
}

#[tokio::test]
async fn definitions_added_later_are_picked_up() {
    let h = Harness::new();
    let mut wt = h.worktree_loop();
    wt.poll_once().await.unwrap();

    h.job("lint", LINT_JOB);
    h.git.commit("touch", &["src/app.js"]);
    let report = wt.poll_once().await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(h.sink.count("job:discovered"), 1);
}
