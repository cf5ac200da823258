// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn starts_idle() {
    assert_eq!(StateCell::default().get(), DaemonState::Idle);
}

#[test]
fn full_lifecycle() {
    let cell = StateCell::default();
    use DaemonState::*;
    for (from, to) in [
        (Idle, Starting),
        (Starting, Running),
        (Running, Draining),
        (Draining, Stopped),
        (Stopped, Starting),
    ] {
        assert_eq!(cell.transition(&[from], to, "test").unwrap(), from);
        assert_eq!(cell.get(), to);
    }
}

#[test]
fn rejects_transition_from_wrong_state() {
    let cell = StateCell::default();
    let err = cell
        .transition(&[DaemonState::Running], DaemonState::Draining, "stop")
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot stop while idle");
    assert_eq!(cell.get(), DaemonState::Idle);
}

#[test]
fn clones_share_state() {
    let a = StateCell::default();
    let b = a.clone();
    a.transition(&[DaemonState::Idle], DaemonState::Starting, "start")
        .unwrap();
    assert_eq!(b.get(), DaemonState::Starting);
}

#[parameterized(
    idle = { DaemonState::Idle, "\"idle\"" },
    draining = { DaemonState::Draining, "\"draining\"" },
)]
fn serializes_lowercase(state: DaemonState, json: &str) {
    assert_eq!(serde_json::to_string(&state).unwrap(), json);
    assert_eq!(state.to_string(), json.trim_matches('"'));
}
