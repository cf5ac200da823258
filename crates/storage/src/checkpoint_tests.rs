// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn first_run_has_no_checkpoint() {
    let dir = tempdir().unwrap();
    assert_eq!(Checkpoint::load(dir.path()).unwrap(), None);
}

#[test]
fn save_and_reload() {
    let dir = tempdir().unwrap();
    let mut cp = Checkpoint::default();
    cp.refs.insert("refs/heads/main".to_string(), "a".repeat(40));
    cp.refs.insert("refs/tags/v1.0.0".to_string(), "b".repeat(40));
    cp.last_cron_minute = Some("2026-03-01T02:00Z".to_string());
    cp.save(dir.path()).unwrap();

    assert!(dir.path().join(".gitvan/state/checkpoint.json").exists());
    let loaded = Checkpoint::load(dir.path()).unwrap().unwrap();
    assert_eq!(loaded, cp);
    assert_eq!(loaded.head("refs/heads/main"), Some("a".repeat(40).as_str()));
    assert_eq!(loaded.head("refs/heads/dev"), None);
}

#[test]
fn wire_format_is_camel_case() {
    let cp = Checkpoint {
        last_cron_minute: Some("2026-03-01T02:00Z".to_string()),
        ..Checkpoint::default()
    };
    let json = serde_json::to_value(&cp).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"version": 1, "refs": {}, "lastCronMinute": "2026-03-01T02:00Z"})
    );
}

#[test]
fn corrupt_checkpoint_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = Checkpoint::path_for(dir.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "garbage").unwrap();

    assert_eq!(Checkpoint::load(dir.path()).unwrap(), None);
    assert!(path.with_file_name("checkpoint.json.bak").exists());
}
