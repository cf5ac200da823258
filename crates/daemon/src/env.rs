// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

/// Log filter directive, e.g. `debug` or `gv_engine=trace,info`.
pub const LOG_ENV: &str = "GITVAN_LOG";

/// Filter directive from `GITVAN_LOG`, or `default` when unset or blank.
pub fn log_filter(default: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
