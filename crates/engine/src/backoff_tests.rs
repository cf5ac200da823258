// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    first = { 1, 250 },
    second = { 2, 500 },
    third = { 3, 1000 },
    capped = { 12, 30_000 },
    huge = { 200, 30_000 },
)]
fn delay_without_jitter(attempt: u8, expected_ms: u64) {
    let backoff = Backoff::default();
    assert_eq!(
        backoff.delay(attempt, 0.0),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn jitter_bounds() {
    let backoff = Backoff::default();
    assert_eq!(backoff.delay(1, 1.0), Duration::from_millis(300));
    assert_eq!(backoff.delay(1, -1.0), Duration::from_millis(200));
    assert_eq!(backoff.delay(1, 5.0), Duration::from_millis(300));
}

#[test]
fn random_delay_stays_in_band() {
    let backoff = Backoff::default();
    for _ in 0..50 {
        let d = backoff.next_delay(2);
        assert!(d >= Duration::from_millis(400) && d <= Duration::from_millis(600));
    }
}

#[test]
fn none_never_waits() {
    assert_eq!(Backoff::none().next_delay(4), Duration::ZERO);
}
