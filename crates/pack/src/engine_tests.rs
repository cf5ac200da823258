// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::MemoryRegistry;
use crate::spec::ManifestFormat;
use chrono::TimeZone;
use gv_core::config::state_dir_for;
use gv_core::test_support::RecordingSink;
use gv_core::{FakeClock, SequentialIdGen};
use std::sync::Arc;
use tempfile::TempDir;

const RETENTION: Duration = Duration::from_secs(30 * 86_400);

struct Fixture {
    dir: TempDir,
    engine: PackEngine<FakeClock, SequentialIdGen>,
    sink: Arc<RecordingSink>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::at(chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let hooks = HookBus::new();
        let sink = Arc::new(RecordingSink::default());
        hooks.subscribe(sink.clone());
        let engine = PackEngine::new(
            dir.path(),
            SnapshotStore::with_ids(
                state_dir_for(dir.path()).join("snapshots"),
                SequentialIdGen::new("snap"),
            ),
            PackStateStore::for_worktree(dir.path()),
            clock,
            RETENTION,
        )
        .with_hooks(hooks);
        Self { dir, engine, sink }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        let p = self.path(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    fn hash(&self, rel: &str) -> String {
        content_hash(&fs::read(self.path(rel)).unwrap())
    }

    fn state(&self) -> PackStateFile {
        PackStateStore::for_worktree(self.dir.path()).load().unwrap()
    }
}

fn spec(toml: &str) -> PackSpec {
    PackSpec::parse(toml, ManifestFormat::Toml, Path::new("pack.toml"), None).unwrap()
}

fn no_opts() -> BTreeMap<String, String> {
    BTreeMap::new()
}

const RELEASE_PACK: &str = r##"
id = "release"
version = "1.0.0"

[options.project]
default = "demo"

[[transforms]]
op = "json-merge"
path = "package.json"
value = { scripts = { release = "gitvan pack apply" } }

[[transforms]]
op = "create"
path = "CHANGELOG.md"
content = "# ${project} changelog\n"
"##;

#[test]
fn second_apply_of_identical_pack_is_skipped() {
    let fx = Fixture::new();
    fx.write("package.json", "{\"name\": \"demo\"}\n");
    let pack = spec(RELEASE_PACK);

    let first = fx.engine.apply(&pack, &no_opts()).unwrap();
    assert_eq!(first.status(), "installed");
    let second = fx.engine.apply(&pack, &no_opts()).unwrap();
    assert_eq!(second.status(), "skipped");

    let state = fx.state();
    assert_eq!(state.packs.len(), 1);
    let ops: Vec<OperationKind> = state.operations.iter().map(|o| o.op).collect();
    assert_eq!(ops, [OperationKind::Apply, OperationKind::Skip]);
    assert_eq!(fx.sink.names(), ["pack:applied", "pack:skipped"]);
}

#[test]
fn rollback_restores_modified_and_removes_created() {
    let fx = Fixture::new();
    fx.write("package.json", "{\"name\": \"demo\", \"version\": \"1.0.0\"}\n");
    let before = fx.hash("package.json");

    let outcome = fx.engine.apply(&spec(RELEASE_PACK), &no_opts()).unwrap();
    let ApplyOutcome::Installed { artifacts, .. } = outcome else {
        panic!("expected install");
    };
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].change, ArtifactChange::Modified);
    assert_eq!(artifacts[1].change, ArtifactChange::Created);
    assert_eq!(fx.read("CHANGELOG.md"), "# demo changelog\n");
    let merged: Value = serde_json::from_str(&fx.read("package.json")).unwrap();
    assert_eq!(merged["scripts"]["release"], "gitvan pack apply");
    assert_eq!(merged["name"], "demo");

    let report = fx.engine.rollback(&PackId::new("release")).unwrap();
    assert!(report.is_complete());
    assert_eq!(fx.hash("package.json"), before);
    assert!(!fx.path("CHANGELOG.md").exists());
    assert!(fx.state().packs.is_empty());
    assert_eq!(fx.sink.count("pack:rolled-back"), 1);
}

#[test]
fn rollback_plan_reverses_artifacts() {
    let fx = Fixture::new();
    fx.write("package.json", "{}\n");
    fx.engine.apply(&spec(RELEASE_PACK), &no_opts()).unwrap();

    let plan = fx.engine.plan_rollback(&PackId::new("release")).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].path, "CHANGELOG.md");
    assert_eq!(plan[0].action, RollbackAction::Delete);
    assert_eq!(plan[1].path, "package.json");
    assert!(matches!(plan[1].action, RollbackAction::Restore { .. }));
}

#[test]
fn failing_transform_restores_batch() {
    let fx = Fixture::new();
    fx.write("README.md", "original\n");
    fx.write("exists.txt", "keep\n");
    let pack = spec(
        r#"
id = "broken"
version = "0.1.0"

[[transforms]]
op = "write"
path = "README.md"
content = "replaced\n"

[[transforms]]
op = "write"
path = "docs/new.md"
content = "new\n"

[[transforms]]
op = "create"
path = "exists.txt"
content = "clobber\n"
"#,
    );

    let err = fx.engine.apply(&pack, &no_opts()).unwrap_err();
    match &err {
        PackError::Transform {
            index,
            path,
            rollback_failures,
            ..
        } => {
            assert_eq!(*index, 2);
            assert_eq!(path, "exists.txt");
            assert_eq!(*rollback_failures, 0);
        }
        other => panic!("expected transform error, got {:?}", other),
    }
    assert_eq!(fx.read("README.md"), "original\n");
    assert_eq!(fx.read("exists.txt"), "keep\n");
    assert!(!fx.path("docs/new.md").exists());

    let state = fx.state();
    assert!(state.packs.is_empty());
    assert_eq!(state.operations.len(), 1);
    assert!(!state.operations[0].ok);
}

#[test]
fn delete_transform_round_trips() {
    let fx = Fixture::new();
    fx.write("legacy.cfg", "old=1\n");
    let pack = spec(
        "id = \"cleanup\"\nversion = \"1.0.0\"\n[[transforms]]\nop = \"delete\"\npath = \"legacy.cfg\"\n",
    );

    let ApplyOutcome::Installed { artifacts, .. } = fx.engine.apply(&pack, &no_opts()).unwrap()
    else {
        panic!("expected install");
    };
    assert_eq!(artifacts[0].change, ArtifactChange::Deleted);
    assert!(artifacts[0].hash.is_none());
    assert!(!fx.path("legacy.cfg").exists());

    fx.engine.rollback(&PackId::new("cleanup")).unwrap();
    assert_eq!(fx.read("legacy.cfg"), "old=1\n");
}

#[test]
fn options_render_paths_and_content() {
    let fx = Fixture::new();
    let pack = spec(
        r#"
id = "notes"
version = "1.0.0"

[options.name]

[[transforms]]
op = "write"
path = "notes/${name}.md"
content = "owner: ${name}\n"

[[transforms]]
op = "append"
path = "notes/${name}.md"
content = "more\n"
"#,
    );

    let opts = BTreeMap::from([("name".to_string(), "ana".to_string())]);
    fx.engine.apply(&pack, &opts).unwrap();
    assert_eq!(fx.read("notes/ana.md"), "owner: ana\nmore\n");

    let state = fx.state();
    let artifacts = &state.packs[&PackId::new("notes")].artifacts;
    assert_eq!(artifacts.len(), 1, "a path touched twice is one artifact");
    assert_eq!(artifacts[0].hash.as_deref(), Some(fx.hash("notes/ana.md").as_str()));
}

#[test]
fn rendered_path_cannot_escape() {
    let fx = Fixture::new();
    let pack = spec(
        "id = \"p\"\nversion = \"1.0.0\"\n[options.dir]\n[[transforms]]\nop = \"write\"\npath = \"${dir}/x\"\ncontent = \"\"\n",
    );
    let opts = BTreeMap::from([("dir".to_string(), "..".to_string())]);
    let err = fx.engine.apply(&pack, &opts).unwrap_err();
    assert_eq!(err.kind(), gv_core::ErrorKind::Validation);
}

#[test]
fn changed_spec_replaces_installed_pack() {
    let fx = Fixture::new();
    fx.write("config.txt", "base\n");
    let v1 = spec(
        "id = \"cfg\"\nversion = \"1.0.0\"\n[[transforms]]\nop = \"append\"\npath = \"config.txt\"\ncontent = \"v1\\n\"\n",
    );
    let v2 = spec(
        "id = \"cfg\"\nversion = \"2.0.0\"\n[[transforms]]\nop = \"append\"\npath = \"config.txt\"\ncontent = \"v2\\n\"\n",
    );

    fx.engine.apply(&v1, &no_opts()).unwrap();
    assert_eq!(fx.read("config.txt"), "base\nv1\n");
    fx.engine.apply(&v2, &no_opts()).unwrap();
    assert_eq!(fx.read("config.txt"), "base\nv2\n");

    let state = fx.state();
    assert_eq!(state.packs[&PackId::new("cfg")].version, "2.0.0");
    let ops: Vec<OperationKind> = state.operations.iter().map(|o| o.op).collect();
    assert_eq!(
        ops,
        [OperationKind::Apply, OperationKind::Rollback, OperationKind::Apply]
    );
}

#[test]
fn verify_reports_drift() {
    let fx = Fixture::new();
    fx.write("package.json", "{}\n");
    fx.engine.apply(&spec(RELEASE_PACK), &no_opts()).unwrap();
    let id = PackId::new("release");

    assert!(fx.engine.verify(&id).unwrap().is_clean());

    fx.write("package.json", "{\"edited\": true}\n");
    fs::remove_file(fx.path("CHANGELOG.md")).unwrap();
    let report = fx.engine.verify(&id).unwrap();
    assert_eq!(report.modified, ["package.json"]);
    assert_eq!(report.missing, ["CHANGELOG.md"]);
    assert!(report.ok.is_empty());
}

#[test]
fn corrupt_snapshot_is_reported_not_thrown() {
    let fx = Fixture::new();
    fx.write("package.json", "{}\n");
    fx.engine.apply(&spec(RELEASE_PACK), &no_opts()).unwrap();
    let id = PackId::new("release");

    let plan = fx.engine.plan_rollback(&id).unwrap();
    let RollbackAction::Restore { snapshot } = &plan[1].action else {
        panic!("expected restore");
    };
    fs::write(
        state_dir_for(fx.dir.path()).join("snapshots").join(snapshot.as_str()),
        "tampered",
    )
    .unwrap();

    let report = fx.engine.rollback(&id).unwrap();
    assert_eq!(report.failed(), 1);
    assert!(!report.steps[1].ok);
    assert!(report.steps[1].error.as_deref().unwrap_or("").contains("corrupt"));
    assert!(!fx.path("CHANGELOG.md").exists());

    let remaining = &fx.state().packs[&id].artifacts;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].path, "package.json");
}

#[test]
fn rollback_of_unknown_pack_fails() {
    let fx = Fixture::new();
    let err = fx.engine.rollback(&PackId::new("ghost")).unwrap_err();
    assert!(matches!(err, PackError::NotInstalled(_)));
    assert_eq!(err.kind(), gv_core::ErrorKind::User);
}

fn registry() -> MemoryRegistry {
    MemoryRegistry::new()
        .with(spec(
            "id = \"base\"\nversion = \"1.0.0\"\n[[transforms]]\nop = \"write\"\npath = \".editorconfig\"\ncontent = \"root = true\\n\"\n",
        ))
        .with(spec(
            "id = \"base\"\nversion = \"1.1.0\"\n[[transforms]]\nop = \"write\"\npath = \".editorconfig\"\ncontent = \"root = true\\n# 1.1\\n\"\n",
        ))
        .with(spec(
            "id = \"app\"\nversion = \"1.0.0\"\n[dependencies]\nbase = \"~1.0\"\n[options.title]\n[[transforms]]\nop = \"write\"\npath = \"TITLE\"\ncontent = \"${title}\"\n",
        ))
}

#[test]
fn install_applies_dependencies_first() {
    let fx = Fixture::new();
    let opts = BTreeMap::from([("title".to_string(), "Demo".to_string())]);
    let outcomes = fx
        .engine
        .install(&registry(), "app", &Constraint::parse("^1").unwrap(), &opts)
        .unwrap();

    let ids: Vec<&str> = outcomes.iter().map(|o| o.pack_id().as_str()).collect();
    assert_eq!(ids, ["base", "app"]);
    assert_eq!(fx.read(".editorconfig"), "root = true\n");
    assert_eq!(fx.read("TITLE"), "Demo");

    let updates = fx.engine.updates(&registry()).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].pack_id.as_str(), "base");
    assert_eq!(updates[0].current, "1.0.0");
    assert_eq!(updates[0].latest, "1.1.0");
}

#[test]
fn list_reports_installed_packs() {
    let fx = Fixture::new();
    assert!(fx.engine.list().unwrap().is_empty());
    fx.write("package.json", "{}\n");
    fx.engine.apply(&spec(RELEASE_PACK), &no_opts()).unwrap();

    let packs = fx.engine.list().unwrap();
    let installed = &packs[&PackId::new("release")];
    assert_eq!(installed.version, "1.0.0");
    assert_eq!(installed.installed_at, "2026-03-01T12:00:00.000Z");
}

#[test]
fn json_merge_is_deep() {
    let mut base = serde_json::json!({"a": {"b": 1, "c": [1]}, "d": "x"});
    merge_json(&mut base, &serde_json::json!({"a": {"c": [2], "e": true}, "f": null}));
    assert_eq!(
        base,
        serde_json::json!({"a": {"b": 1, "c": [2], "e": true}, "d": "x", "f": null})
    );
}
