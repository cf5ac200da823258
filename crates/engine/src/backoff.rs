// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff between retry attempts.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
    /// Fraction of the delay applied as +/- jitter.
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            factor: 2,
            cap: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl Backoff {
    /// No waiting between attempts.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            factor: 1,
            cap: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay before retry `attempt` (1-based), with `unit` in `[-1, 1]`
    /// selecting the jitter.
    pub fn delay(&self, attempt: u8, unit: f64) -> Duration {
        let exp = u32::from(attempt.saturating_sub(1));
        let mult = self.factor.checked_pow(exp).unwrap_or(u32::MAX);
        let raw = self.base.saturating_mul(mult).min(self.cap);
        let scale = 1.0 + self.jitter * unit.clamp(-1.0, 1.0);
        let nanos = raw.as_nanos() as f64 * scale.max(0.0);
        Duration::from_nanos(nanos.round() as u64)
    }

    pub fn next_delay(&self, attempt: u8) -> Duration {
        if self.jitter == 0.0 {
            return self.delay(attempt, 0.0);
        }
        let unit = rand::rng().random_range(-1.0..=1.0);
        self.delay(attempt, unit)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
