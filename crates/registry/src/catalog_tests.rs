// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gv_core::test_support::RecordingSink;
use std::cell::Cell;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    sink: Arc<RecordingSink>,
    registry: Registry,
    writes: Cell<u64>,
}

fn ids<'a>(it: impl Iterator<Item = &'a JobDefinition>) -> Vec<String> {
    it.map(|j| j.id.to_string()).collect()
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let hooks = HookBus::new();
        let sink = Arc::new(RecordingSink::default());
        hooks.subscribe(sink.clone());
        let config = Config::for_root(dir.path());
        let registry = Registry::from_config(&config, hooks);
        Self {
            dir,
            sink,
            registry,
            writes: Cell::new(0),
        }
    }

    /// Write a file and push its mtime forward so the change is always seen.
    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        self.writes.set(self.writes.get() + 1);
        let bump = SystemTime::now() + Duration::from_secs(60 * self.writes.get());
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(bump)
            .unwrap();
        path
    }

    fn remove(&self, rel: &str) {
        std::fs::remove_file(self.dir.path().join(rel)).unwrap();
    }
}

const CLEANUP: &str = "cron = \"0 2 * * *\"\nhandler = \"cleanup\"\n[meta]\ntags = [\"maintenance\"]\n";
const LINT: &str = "[on]\npathChanged = [\"src/**/*.js\"]\n[[run]]\nshell = \"npm run lint\"\n[meta]\ntags = [\"ci\", \"maintenance\"]\n";

#[test]
fn discovers_and_indexes() {
    let mut fx = Fixture::new();
    fx.write("jobs/cleanup.toml", CLEANUP);
    fx.write("jobs/lint/changed.toml", LINT);
    fx.write("jobs/docs.json", r#"{"run": [{"shell": "make docs"}]}"#);
    fx.write("events/merge-to/main.toml", "job = \"docs\"\n");

    let report = fx.registry.scan();
    assert_eq!(
        report.discovered,
        vec!["cleanup", "docs", "lint.changed", "event:merge-to.main"]
    );
    assert!(report.invalid.is_empty());
    assert!(report.changed());

    let catalog = fx.registry.catalog();
    assert_eq!(catalog.len(), 4);
    assert_eq!(ids(catalog.cron_jobs()), vec!["cleanup"]);
    assert_eq!(ids(catalog.event_jobs()), vec!["lint.changed"]);
    assert_eq!(
        ids(catalog.with_tag("maintenance")),
        vec!["cleanup", "lint.changed"]
    );
    assert_eq!(ids(catalog.with_tag("nope")), Vec::<String>::new());

    let event = catalog.event("merge-to.main").unwrap();
    assert_eq!(event.predicate.merge_to.as_deref(), Some("main"));
    assert_eq!(fx.sink.count("job:discovered"), 4);
}

#[test]
fn unchanged_rescan_is_quiet() {
    let mut fx = Fixture::new();
    fx.write("jobs/cleanup.toml", CLEANUP);
    fx.registry.scan();
    let before = fx.registry.catalog();
    fx.sink.clear();

    let report = fx.registry.scan();
    assert!(!report.changed());
    assert!(fx.sink.events().is_empty());
    assert!(Arc::ptr_eq(&before, &fx.registry.catalog()));
}

#[test]
fn touched_but_identical_is_not_an_update() {
    let mut fx = Fixture::new();
    fx.write("jobs/cleanup.toml", CLEANUP);
    fx.registry.scan();
    fx.write("jobs/cleanup.toml", CLEANUP);

    let report = fx.registry.scan();
    assert!(!report.changed());
}

#[test]
fn detects_update_and_removal() {
    let mut fx = Fixture::new();
    fx.write("jobs/cleanup.toml", CLEANUP);
    fx.write("jobs/lint/changed.toml", LINT);
    fx.registry.scan();
    fx.sink.clear();

    fx.write(
        "jobs/cleanup.toml",
        "cron = \"30 3 * * *\"\nhandler = \"cleanup\"\n",
    );
    fx.remove("jobs/lint/changed.toml");
    let report = fx.registry.scan();

    assert_eq!(report.updated, vec!["cleanup"]);
    assert_eq!(report.removed, vec!["lint.changed"]);
    assert_eq!(fx.sink.names(), vec!["job:updated", "job:removed"]);
    let catalog = fx.registry.catalog();
    assert_eq!(
        catalog.job("cleanup").unwrap().cron.as_ref().unwrap().as_str(),
        "30 3 * * *"
    );
    assert!(catalog.job("lint.changed").is_none());
}

#[test]
fn invalid_files_are_reported_not_fatal() {
    let mut fx = Fixture::new();
    fx.write("jobs/cleanup.toml", CLEANUP);
    let bad = fx.write("jobs/broken.toml", "cron = \"not cron\"\nhandler = \"x\"\n");
    fx.write("jobs/garbage.json", "{ nope");

    let report = fx.registry.scan();
    assert_eq!(report.discovered, vec!["cleanup"]);
    assert_eq!(report.invalid.len(), 2);
    assert_eq!(report.invalid[0].0, bad);
    assert_eq!(fx.sink.count("job:validate"), 2);

    // Still invalid and unchanged: reported, but no new hook events.
    fx.sink.clear();
    let report = fx.registry.scan();
    assert_eq!(report.invalid.len(), 2);
    assert_eq!(fx.sink.count("job:validate"), 0);

    // Fixing the file brings the job in.
    fx.write("jobs/broken.toml", "cron = \"@daily\"\nhandler = \"x\"\n");
    let report = fx.registry.scan();
    assert_eq!(report.discovered, vec!["broken"]);
    assert_eq!(report.invalid.len(), 1);
}

#[test]
fn higher_priority_wins_conflict() {
    let mut fx = Fixture::new();
    let low = fx.write("jobs/a.toml", "id = \"deploy\"\nhandler = \"low\"\n[meta]\npriority = 1\n");
    let high = fx.write("jobs/b.toml", "id = \"deploy\"\nhandler = \"high\"\n[meta]\npriority = 5\n");

    let report = fx.registry.scan();
    assert_eq!(report.conflicts, vec![("deploy".to_string(), high.clone(), low)]);
    assert_eq!(
        fx.registry.catalog().job("deploy").unwrap().source,
        high
    );
    assert_eq!(fx.sink.count("job:conflict"), 1);

    // The same conflict is not re-announced.
    fx.registry.scan();
    assert_eq!(fx.sink.count("job:conflict"), 1);
}

#[test]
fn equal_priority_conflict_prefers_smaller_path() {
    let mut fx = Fixture::new();
    let z = fx.write("jobs/z.toml", "id = \"deploy\"\nhandler = \"z\"\n");
    let a = fx.write("jobs/a.toml", "id = \"deploy\"\nhandler = \"a\"\n");

    let report = fx.registry.scan();
    assert_eq!(report.conflicts, vec![("deploy".to_string(), a.clone(), z)]);
    assert_eq!(fx.registry.catalog().job("deploy").unwrap().source, a);
}

#[test]
fn missing_roots_yield_empty_catalog() {
    let mut fx = Fixture::new();
    let report = fx.registry.scan();
    assert_eq!(report, ScanReport::default());
    assert!(fx.registry.catalog().is_empty());
}

#[test]
fn hcl_and_json_definitions_load() {
    let mut fx = Fixture::new();
    fx.write(
        "jobs/release.hcl",
        "on {\n  any = [{ tagCreate = \"v.*\" }, { semverTag = true }]\n}\nhandler = \"release\"\n",
    );
    fx.write(
        "events/tag/semver.json",
        r#"{"run": [{"write": "dist/release.json", "content": "{}"}]}"#,
    );
    let report = fx.registry.scan();
    assert_eq!(report.discovered, vec!["release", "event:tag.semver"]);
    let catalog = fx.registry.catalog();
    assert_eq!(catalog.event("tag.semver").unwrap().predicate.semver_tag, Some(true));
}
