// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon state machine: `idle → starting → running → draining → stopped`.

use crate::error::DaemonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DaemonState {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Draining = 3,
    Stopped = 4,
}

impl DaemonState {
    pub fn as_str(self) -> &'static str {
        match self {
            DaemonState::Idle => "idle",
            DaemonState::Starting => "starting",
            DaemonState::Running => "running",
            DaemonState::Draining => "draining",
            DaemonState::Stopped => "stopped",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => DaemonState::Idle,
            1 => DaemonState::Starting,
            2 => DaemonState::Running,
            3 => DaemonState::Draining,
            _ => DaemonState::Stopped,
        }
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free current state.
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl Default for StateCell {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(DaemonState::Idle as u8)))
    }
}

impl StateCell {
    pub fn get(&self) -> DaemonState {
        DaemonState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `to` if the current state is one of `from`.
    ///
    /// Concurrent callers race on a compare-exchange, so exactly one wins.
    pub fn transition(
        &self,
        from: &[DaemonState],
        to: DaemonState,
        action: &'static str,
    ) -> Result<DaemonState, DaemonError> {
        let mut current = self.get();
        loop {
            if !from.contains(&current) {
                return Err(DaemonError::InvalidTransition {
                    from: current,
                    action,
                });
            }
            match self.0.compare_exchange(
                current as u8,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    tracing::debug!(from = %current, to = %to, "daemon state");
                    return Ok(current);
                }
                Err(actual) => current = DaemonState::from_u8(actual),
            }
        }
    }

    /// Unconditional move, for unwinding a failed start.
    pub(crate) fn set(&self, to: DaemonState) {
        self.0.store(to as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
