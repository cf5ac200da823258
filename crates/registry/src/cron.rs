// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expressions, evaluated in UTC.
//!
//! `minute hour day-of-month month day-of-week`, with lists, ranges, steps,
//! month and weekday names, `7` as Sunday, and the `@hourly`-style macros.
//! When both day fields are restricted a day matches if either does.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on the search horizon for [`CronExpr::next_after`].
const MAX_SEARCH_DAYS: i64 = 366 * 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cron expression {expr:?}: {field}: {reason}")]
pub struct CronError {
    pub expr: String,
    pub field: &'static str,
    pub reason: String,
}

#[derive(Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
};
const DOM: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ],
};
// 7 is accepted and folded onto Sunday.
const DOW: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
};

/// A parsed cron expression.
#[derive(Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minutes: u64,
    hours: u32,
    days_of_month: u32,
    months: u16,
    days_of_week: u8,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl fmt::Debug for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CronExpr({:?})", self.source)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpr {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl serde::Serialize for CronExpr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> serde::Deserialize<'de> for CronExpr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CronExpr::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn expand_macro(s: &str) -> Option<&'static str> {
    match s {
        "@yearly" | "@annually" => Some("0 0 1 1 *"),
        "@monthly" => Some("0 0 1 * *"),
        "@weekly" => Some("0 0 * * 0"),
        "@daily" | "@midnight" => Some("0 0 * * *"),
        "@hourly" => Some("0 * * * *"),
        _ => None,
    }
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let trimmed = expr.trim();
        let err = |field: &'static str, reason: String| CronError {
            expr: expr.to_string(),
            field,
            reason,
        };

        let body = if trimmed.starts_with('@') {
            expand_macro(&trimmed.to_ascii_lowercase())
                .ok_or_else(|| err("macro", format!("unknown macro {}", trimmed)))?
        } else {
            trimmed
        };

        let fields: Vec<&str> = body.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(err(
                "expression",
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }

        let parse = |spec: FieldSpec, text: &str| {
            parse_field(spec, text).map_err(|reason| err(spec.name, reason))
        };
        let minutes = parse(MINUTE, fields[0])?;
        let hours = parse(HOUR, fields[1])?;
        let days_of_month = parse(DOM, fields[2])?;
        let months = parse(MONTH, fields[3])?;
        let mut days_of_week = parse(DOW, fields[4])?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            source: trimmed.to_string(),
            minutes,
            hours: hours as u32,
            days_of_month: days_of_month as u32,
            months: months as u16,
            days_of_week: days_of_week as u8,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the UTC minute containing `t` is a firing minute.
    pub fn matches(&self, t: DateTime<Utc>) -> bool {
        bit(self.minutes, t.minute())
            && bit(self.hours as u64, t.hour())
            && bit(self.months as u64, t.month())
            && self.day_matches(t.date_naive())
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = bit(self.days_of_month as u64, date.day());
        let dow = bit(
            self.days_of_week as u64,
            date.weekday().num_days_from_sunday(),
        );
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First firing minute strictly after `t`.
    pub fn next_after(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = floor_minute(t) + Duration::minutes(1);
        let horizon = start + Duration::days(MAX_SEARCH_DAYS);
        let mut cur = start;
        while cur < horizon {
            if !bit(self.months as u64, cur.month()) {
                cur = first_of_next_month(cur)?;
                continue;
            }
            if !self.day_matches(cur.date_naive()) {
                cur = start_of_day(cur.date_naive().succ_opt()?);
                continue;
            }
            if !bit(self.hours as u64, cur.hour()) {
                cur = floor_hour(cur) + Duration::hours(1);
                continue;
            }
            if !bit(self.minutes, cur.minute()) {
                cur += Duration::minutes(1);
                continue;
            }
            return Some(cur);
        }
        None
    }
}

fn bit(mask: u64, n: u32) -> bool {
    n < 64 && mask & (1u64 << n) != 0
}

fn floor_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(t)
}

fn floor_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    floor_minute(t).with_minute(0).unwrap_or(t)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

fn first_of_next_month(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (y, m) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).map(start_of_day)
}

fn parse_value(spec: FieldSpec, text: &str) -> Result<u32, String> {
    let lower = text.to_ascii_lowercase();
    if let Some(i) = spec.names.iter().position(|n| *n == lower) {
        return Ok(i as u32 + if spec.min == 1 { 1 } else { 0 });
    }
    let value: u32 = text
        .parse()
        .map_err(|_| format!("invalid value {:?}", text))?;
    if value < spec.min || value > spec.max {
        return Err(format!(
            "{} out of range {}-{}",
            value, spec.min, spec.max
        ));
    }
    Ok(value)
}

fn parse_field(spec: FieldSpec, text: &str) -> Result<u64, String> {
    if text.is_empty() {
        return Err("empty field".to_string());
    }
    let mut mask = 0u64;
    for item in text.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| format!("invalid step {:?}", s))?;
                if step == 0 {
                    return Err("step must be positive".to_string());
                }
                (r, Some(step))
            }
            None => (item, None),
        };
        let (lo, hi) = if range == "*" {
            (spec.min, if spec.name == DOW.name { 6 } else { spec.max })
        } else if let Some((a, b)) = range.split_once('-') {
            let (lo, hi) = (parse_value(spec, a)?, parse_value(spec, b)?);
            if lo > hi {
                return Err(format!("descending range {}", range));
            }
            (lo, hi)
        } else {
            let v = parse_value(spec, range)?;
            // `a/step` runs from `a` to the end of the field.
            (v, if step.is_some() { spec.max } else { v })
        };
        let step = step.unwrap_or(1);
        let mut v = lo;
        while v <= hi {
            mask |= 1u64 << v;
            v += step;
        }
    }
    Ok(mask)
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
