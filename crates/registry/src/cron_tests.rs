// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[parameterized(
    every_minute = { "* * * * *", "2026-03-01T02:00:00Z", true },
    daily_at_two = { "0 2 * * *", "2026-03-01T02:00:00Z", true },
    daily_wrong_minute = { "0 2 * * *", "2026-03-01T02:01:00Z", false },
    step_minutes = { "*/15 * * * *", "2026-03-01T10:45:00Z", true },
    step_misses = { "*/15 * * * *", "2026-03-01T10:44:00Z", false },
    offset_step = { "5/20 * * * *", "2026-03-01T10:25:00Z", true },
    range_hours = { "0 9-17 * * *", "2026-03-01T17:00:00Z", true },
    list_minutes = { "1,2,30 * * * *", "2026-03-01T10:30:00Z", true },
    month_name = { "0 0 1 jan *", "2026-01-01T00:00:00Z", true },
    weekday_name = { "0 0 * * mon-fri", "2026-03-02T00:00:00Z", true },
    weekend_excluded = { "0 0 * * mon-fri", "2026-03-01T00:00:00Z", false },
    seven_is_sunday = { "0 0 * * 7", "2026-03-01T00:00:00Z", true },
    seconds_ignored = { "30 4 * * *", "2026-03-01T04:30:59Z", true },
)]
fn matches(expr: &str, time: &str, expected: bool) {
    let cron = CronExpr::parse(expr).unwrap();
    assert_eq!(cron.matches(at(time)), expected, "{} at {}", expr, time);
}

#[test]
fn restricted_day_fields_are_or_ed() {
    // 2026-03-01 is a Sunday, 2026-03-15 is a Sunday, 2026-03-13 is a Friday.
    let cron = CronExpr::parse("0 0 13 * 5").unwrap();
    assert!(cron.matches(at("2026-03-13T00:00:00Z")));
    assert!(cron.matches(at("2026-03-06T00:00:00Z")));
    assert!(!cron.matches(at("2026-03-14T00:00:00Z")));
}

#[test]
fn star_day_field_requires_both() {
    let cron = CronExpr::parse("0 0 13 * *").unwrap();
    assert!(cron.matches(at("2026-03-13T00:00:00Z")));
    assert!(!cron.matches(at("2026-03-06T00:00:00Z")));
}

#[parameterized(
    hourly = { "@hourly", "0 * * * *" },
    daily = { "@daily", "0 0 * * *" },
    midnight = { "@midnight", "0 0 * * *" },
    weekly = { "@weekly", "0 0 * * 0" },
    monthly = { "@monthly", "0 0 1 * *" },
    yearly = { "@yearly", "0 0 1 1 *" },
    annually = { "@annually", "0 0 1 1 *" },
)]
fn macros_expand(expr: &str, equivalent: &str) {
    let a = CronExpr::parse(expr).unwrap();
    let b = CronExpr::parse(equivalent).unwrap();
    let start = at("2026-01-01T00:00:00Z");
    let mut t = start;
    for _ in 0..5 {
        let next_a = a.next_after(t).unwrap();
        assert_eq!(Some(next_a), b.next_after(t));
        t = next_a;
    }
    assert_eq!(a.as_str(), expr);
}

#[parameterized(
    too_few = { "* * * *", "expression" },
    too_many = { "* * * * * *", "expression" },
    minute_range = { "60 * * * *", "minute" },
    hour_range = { "0 24 * * *", "hour" },
    zero_dom = { "0 0 0 * *", "day-of-month" },
    bad_month = { "0 0 1 foo *", "month" },
    zero_step = { "*/0 * * * *", "minute" },
    descending = { "0 5-1 * * *", "hour" },
    reboot = { "@reboot", "macro" },
    empty_item = { "1,,2 * * * *", "minute" },
)]
fn rejects(expr: &str, field: &str) {
    let err = CronExpr::parse(expr).unwrap_err();
    assert_eq!(err.field, field, "{}", err);
}

#[test]
fn next_after_is_strictly_later() {
    let cron = CronExpr::parse("0 2 * * *").unwrap();
    let next = cron.next_after(at("2026-03-01T02:00:00Z")).unwrap();
    assert_eq!(next, at("2026-03-02T02:00:00Z"));
    let next = cron.next_after(at("2026-03-01T01:59:30Z")).unwrap();
    assert_eq!(next, at("2026-03-01T02:00:00Z"));
}

#[test]
fn next_after_crosses_month_and_year() {
    let cron = CronExpr::parse("30 6 1 1 *").unwrap();
    let next = cron.next_after(at("2026-03-01T00:00:00Z")).unwrap();
    assert_eq!(next, at("2027-01-01T06:30:00Z"));
}

#[test]
fn next_after_finds_leap_day() {
    let cron = CronExpr::parse("0 0 29 2 *").unwrap();
    let next = cron.next_after(at("2026-03-01T00:00:00Z")).unwrap();
    assert_eq!(next, at("2028-02-29T00:00:00Z"));
}

#[test]
fn impossible_date_never_fires() {
    let cron = CronExpr::parse("0 0 31 2 *").unwrap();
    assert_eq!(cron.next_after(at("2026-03-01T00:00:00Z")), None);
}

#[test]
fn serde_uses_source_text() {
    let cron: CronExpr = serde_json::from_str("\"*/5 * * * *\"").unwrap();
    assert_eq!(serde_json::to_string(&cron).unwrap(), "\"*/5 * * * *\"");
    assert!(serde_json::from_str::<CronExpr>("\"nope\"").is_err());
}
