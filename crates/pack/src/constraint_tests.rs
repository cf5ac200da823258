// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn sat(range: &str, version: &str) -> bool {
    Constraint::parse(range)
        .unwrap()
        .satisfies(&Version::parse(version).unwrap())
}

#[parameterized(
    caret_major = { "^1.2.3", "1.9.0" },
    caret_same = { "^1.2.3", "1.2.3" },
    caret_zero_minor = { "^0.2.3", "0.2.9" },
    caret_zero_zero = { "^0.0.3", "0.0.3" },
    caret_partial = { "^1.2", "1.4.0" },
    caret_x = { "^0.x", "0.9.9" },
    tilde_patch = { "~1.2.3", "1.2.9" },
    tilde_minor = { "~1.2", "1.2.0" },
    tilde_major = { "~1", "1.7.2" },
    exact = { "1.2.3", "1.2.3" },
    exact_eq = { "=1.2.3", "1.2.3" },
    gte = { ">=1.0.0", "3.0.0" },
    gt_partial = { ">1.2", "1.3.0" },
    lt = { "<2.0.0", "1.99.99" },
    lte_partial = { "<=1.2", "1.2.99" },
    x_range = { "1.x", "1.5.5" },
    x_minor = { "1.2.x", "1.2.7" },
    star = { "*", "42.0.0" },
    empty = { "", "0.0.1" },
    and_set = { ">=1.0.0 <2.0.0", "1.5.0" },
    spaced_op = { ">= 1.0.0 < 2.0.0", "1.5.0" },
    or_set = { "^1.0.0 || ^3.0.0", "3.1.0" },
    hyphen = { "1.2.3 - 2.3.4", "2.3.4" },
    hyphen_partial = { "1.2 - 2.3", "2.3.9" },
    pre_same_triple = { "^1.2.3-beta.2", "1.2.3-beta.4" },
    pre_exact = { "1.0.0-rc.1", "1.0.0-rc.1" },
    pre_gte = { ">=1.0.0-alpha", "1.0.0-beta" },
    release_after_pre = { ">=1.0.0-alpha", "1.0.0" },
)]
fn satisfied(range: &str, version: &str) {
    assert!(sat(range, version), "{} should satisfy {}", version, range);
}

#[parameterized(
    caret_next_major = { "^1.2.3", "2.0.0" },
    caret_below = { "^1.2.3", "1.2.2" },
    caret_zero_minor = { "^0.2.3", "0.3.0" },
    caret_zero_zero = { "^0.0.3", "0.0.4" },
    tilde_next_minor = { "~1.2.3", "1.3.0" },
    exact = { "1.2.3", "1.2.4" },
    gt = { ">1.2.3", "1.2.3" },
    gt_partial = { ">1.2", "1.2.9" },
    lt_partial = { "<1.2", "1.2.0" },
    x_range = { "1.x", "2.0.0" },
    and_set = { ">=1.0.0 <2.0.0", "2.0.0" },
    or_set = { "^1.0.0 || ^3.0.0", "2.0.0" },
    hyphen = { "1.2.3 - 2.3.4", "2.3.5" },
    pre_other_triple = { "^1.2.3-beta.2", "1.2.4-beta.1" },
    pre_excluded_by_release_range = { "^1.0.0", "1.5.0-rc.1" },
    pre_under_upper_bound = { "<2.0.0", "2.0.0-alpha" },
    star_excludes_pre = { "*", "1.0.0-rc.1" },
    pre_lower = { "^1.2.3-beta.2", "1.2.3-beta.1" },
)]
fn not_satisfied(range: &str, version: &str) {
    assert!(!sat(range, version), "{} should not satisfy {}", version, range);
}

#[parameterized(
    garbage = { "latest" },
    bad_number = { "^1.a.0" },
    wild_then_number = { "1.x.3" },
    partial_pre = { "1.2-beta" },
    dangling_hyphen = { "1.0.0 - " },
    too_long = { "1.2.3.4" },
)]
fn rejects(range: &str) {
    assert!(Constraint::parse(range).is_err(), "{:?} should fail", range);
}

#[test]
fn greatest_satisfying_picks_max() {
    let versions: Vec<Version> = ["1.0.0", "1.4.2", "1.10.0", "2.0.0", "2.1.0-beta"]
        .iter()
        .map(|s| Version::parse(s).unwrap())
        .collect();

    let pick = |range: &str| {
        greatest_satisfying(&versions, &Constraint::parse(range).unwrap()).map(ToString::to_string)
    };
    assert_eq!(pick("^1.0.0").as_deref(), Some("1.10.0"));
    assert_eq!(pick("~1.4").as_deref(), Some("1.4.2"));
    assert_eq!(pick("*").as_deref(), Some("2.0.0"));
    assert_eq!(pick(">=2.1.0-alpha").as_deref(), Some("2.1.0-beta"));
    assert_eq!(pick("^3"), None);
}

#[test]
fn update_available_only_when_newer() {
    let versions: Vec<Version> = ["1.0.0", "1.1.0", "2.0.0"]
        .iter()
        .map(|s| Version::parse(s).unwrap())
        .collect();
    let caret = Constraint::parse("^1.0.0").unwrap();
    let current = Version::parse("1.0.0").unwrap();

    let update = is_update_available(&current, &versions, &caret);
    assert_eq!(update.map(ToString::to_string).as_deref(), Some("1.1.0"));

    let latest = Version::parse("1.1.0").unwrap();
    assert!(is_update_available(&latest, &versions, &caret).is_none());
}

#[test]
fn exact_constraint_displays_version() {
    let v = Version::parse("2.3.4").unwrap();
    let c = Constraint::exact(&v);
    assert_eq!(c.to_string(), "2.3.4");
    assert!(c.satisfies(&v));
}

proptest! {
    #[test]
    fn greatest_satisfying_is_monotone(
        base in proptest::collection::vec((0u64..3, 0u64..5, 0u64..5), 1..8),
        extra in (0u64..3, 0u64..5, 0u64..5),
    ) {
        let c = Constraint::parse("^1.0.0 || ~2.1").unwrap();
        let small: Vec<Version> = base.iter().map(|(a, b, p)| Version::new(*a, *b, *p)).collect();
        let mut large = small.clone();
        large.push(Version::new(extra.0, extra.1, extra.2));

        let before = greatest_satisfying(&small, &c).cloned();
        let after = greatest_satisfying(&large, &c).cloned();
        match (before, after) {
            (Some(b), Some(a)) => prop_assert!(a >= b),
            (Some(_), None) => prop_assert!(false, "adding a version lost a match"),
            _ => {}
        }
    }

    #[test]
    fn caret_agrees_with_manual_bounds(major in 1u64..5, minor in 0u64..5, patch in 0u64..5,
                                       vm in 0u64..6, vn in 0u64..6, vp in 0u64..6) {
        let c = Constraint::parse(&format!("^{}.{}.{}", major, minor, patch)).unwrap();
        let lo = Version::new(major, minor, patch);
        let v = Version::new(vm, vn, vp);
        prop_assert_eq!(c.satisfies(&v), v >= lo && vm == major);
    }
}
