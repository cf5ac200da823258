// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::process::Command;

#[tokio::test]
async fn run_with_timeout_success() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn run_with_timeout_nonzero_exit_is_not_an_error() {
    let cmd = Command::new("false");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "false")
        .await
        .unwrap();
    assert!(!output.status.success());
}

#[tokio::test]
async fn run_with_timeout_spawn_error() {
    let cmd = Command::new("/nonexistent/binary");
    let err = run_with_timeout(cmd, Duration::from_secs(5), "nonexistent")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
    assert!(err.to_string().starts_with("nonexistent failed:"), "got: {}", err);
}

#[tokio::test]
async fn run_with_timeout_timeout_elapsed() {
    let mut cmd = Command::new("sleep");
    cmd.arg("10");
    let err = run_with_timeout(cmd, Duration::from_millis(100), "test sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));
    assert!(err.to_string().contains("timed out after 100ms"), "got: {}", err);
}

#[tokio::test]
async fn deterministic_env_is_visible_to_child() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo $TZ $LANG $LC_ALL"]);
    deterministic_env(&mut cmd);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "sh")
        .await
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "UTC C C");
}

#[yare::parameterized(
    short     = { "oops\n", 100, "oops" },
    truncated = { "0123456789", 4, "6789" },
    multibyte = { "ééé", 3, "é" },
)]
fn tail(input: &str, max: usize, expected: &str) {
    assert_eq!(stderr_tail(input.as_bytes(), max), expected);
}
