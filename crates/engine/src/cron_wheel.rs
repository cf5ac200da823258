// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minute-boundary cron evaluation with bounded replay of missed minutes.

use crate::runner::RunRequest;
use chrono::{DateTime, Duration, Utc};
use gv_core::{floor_minute, format_minute, parse_minute, JobId, Trigger};
use gv_registry::Catalog;

/// One scheduled execution: a cron job and the UTC minute it is due for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronTick {
    pub job_id: JobId,
    pub minute: DateTime<Utc>,
}

impl CronTick {
    pub fn minute_utc(&self) -> String {
        format_minute(self.minute)
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::Cron {
            minute_utc: self.minute_utc(),
        }
    }

    /// Run request for this tick; `None` if the job left the catalog.
    pub fn request(&self, catalog: &Catalog) -> Option<RunRequest> {
        let job = catalog.job(self.job_id.as_str())?;
        let payload = serde_json::json!({ "minuteUTC": self.minute_utc() });
        Some(RunRequest::new(job.clone(), self.trigger(), payload))
    }
}

/// Tracks the last evaluated minute.
///
/// A fresh wheel evaluates only the current minute. Afterwards every minute
/// after the last one up to now is evaluated once, oldest first, but never
/// more than `replay_limit` minutes back.
#[derive(Debug, Clone)]
pub struct CronWheel {
    replay_limit: i64,
    last: Option<DateTime<Utc>>,
}

impl CronWheel {
    pub fn new(replay_limit_minutes: u64) -> Self {
        Self {
            replay_limit: replay_limit_minutes.clamp(1, i64::MAX as u64) as i64,
            last: None,
        }
    }

    /// Resume after a stored `YYYY-MM-DDTHH:MMZ` minute.
    pub fn resume(replay_limit_minutes: u64, last: Option<&str>) -> Self {
        let mut wheel = Self::new(replay_limit_minutes);
        wheel.last = last.and_then(parse_minute);
        wheel
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    pub fn last_minute_utc(&self) -> Option<String> {
        self.last.map(format_minute)
    }

    /// Treat the minute containing `now` as evaluated without ticking.
    pub fn mark(&mut self, now: DateTime<Utc>) {
        let current = floor_minute(now);
        if self.last.map_or(true, |last| last < current) {
            self.last = Some(current);
        }
    }

    /// Ticks due between the last evaluated minute and `now`.
    ///
    /// Returns nothing while `now` is still inside the last evaluated minute.
    pub fn advance(&mut self, now: DateTime<Utc>, catalog: &Catalog) -> Vec<CronTick> {
        let current = floor_minute(now);
        let start = match self.last {
            Some(last) if last >= current => return Vec::new(),
            Some(last) => {
                let oldest = current - Duration::minutes(self.replay_limit - 1);
                (last + Duration::minutes(1)).max(oldest)
            }
            None => current,
        };
        self.last = Some(current);

        let mut ticks = Vec::new();
        for job in catalog.cron_jobs() {
            let Some(expr) = &job.cron else { continue };
            let mut minute = if expr.matches(start) {
                Some(start)
            } else {
                expr.next_after(start)
            };
            while let Some(m) = minute.filter(|m| *m <= current) {
                ticks.push(CronTick {
                    job_id: job.id.clone(),
                    minute: m,
                });
                minute = expr.next_after(m);
            }
        }
        ticks.sort_by(|a, b| a.minute.cmp(&b.minute).then_with(|| a.job_id.cmp(&b.job_id)));
        if start < current {
            tracing::debug!(
                from = %format_minute(start),
                to = %format_minute(current),
                ticks = ticks.len(),
                "replayed cron minutes"
            );
        }
        ticks
    }
}

#[cfg(test)]
#[path = "cron_wheel_tests.rs"]
mod tests;
