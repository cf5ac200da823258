// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

// --- Daemon binary ---

pub fn daemon_binary() -> Option<String> {
    std::env::var("GITVAN_DAEMON_BINARY")
        .ok()
        .filter(|s| !s.is_empty())
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

// --- Timeouts ---

/// How long `daemon start` waits for the daemon to report running.
pub fn timeout_start() -> Duration {
    parse_duration_ms("GITVAN_TIMEOUT_START_MS").unwrap_or(Duration::from_secs(5))
}

/// Extra wait on top of the drain deadline before `daemon stop` force-kills.
pub fn timeout_exit() -> Duration {
    parse_duration_ms("GITVAN_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(5))
}

pub fn poll_interval() -> Duration {
    parse_duration_ms("GITVAN_CLI_POLL_MS").unwrap_or(Duration::from_millis(50))
}
