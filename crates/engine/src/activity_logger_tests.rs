// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn appends_timestamped_lines() {
    let dir = tempdir().unwrap();
    let logger = JobLogger::new(dir.path().to_path_buf());
    logger.append("cleanup", "start", "attempt 1");
    logger.append("cleanup", "done", "ok in 12ms");

    let content = std::fs::read_to_string(dir.path().join("jobs/cleanup.log")).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" [start] attempt 1"), "{}", lines[0]);
    assert!(lines[1].ends_with(" [done] ok in 12ms"), "{}", lines[1]);
    assert!(lines[0].starts_with("20"));
}

#[test]
fn fenced_output() {
    let dir = tempdir().unwrap();
    let logger = JobLogger::new(dir.path().to_path_buf());
    logger.append_fenced("cleanup", "lint", "line one\nline two");
    logger.append_fenced("cleanup", "lint", "");

    let content = std::fs::read_to_string(dir.path().join("jobs/cleanup.log")).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("[lint] ```"));
    assert_eq!(lines[1], "line one");
    assert_eq!(lines[2], "line two");
    assert!(lines[3].ends_with("[lint] ```"));
}

#[test]
fn unwritable_dir_does_not_panic() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();
    let logger = JobLogger::new(file);
    logger.append("cleanup", "start", "attempt 1");
}
