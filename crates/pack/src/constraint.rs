// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version constraints with npm range semantics.
//!
//! A constraint is a `||`-separated list of comparator sets; a set is a
//! space-separated conjunction. Caret, tilde, x-ranges, and hyphen ranges
//! are desugared into plain comparators when parsed.

use crate::version::{parse_number, PreId, Version, VersionError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    pub fn test(&self, v: &Version) -> bool {
        match self.op {
            Op::Eq => v == &self.version,
            Op::Gt => v > &self.version,
            Op::Gte => v >= &self.version,
            Op::Lt => v < &self.version,
            Op::Lte => v <= &self.version,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// A parsed range such as `^1.2.0`, `>=1.0.0 <2.0.0 || 3.x`.
#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    /// Empty inner set means "any version".
    sets: Vec<Vec<Comparator>>,
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.sets == other.sets
    }
}

impl Eq for Constraint {}

impl Constraint {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let mut sets = Vec::new();
        for alternative in input.split("||") {
            sets.push(parse_set(input, alternative.trim())?);
        }
        Ok(Self {
            source: input.trim().to_string(),
            sets,
        })
    }

    /// Exactly `version`.
    pub fn exact(version: &Version) -> Self {
        Self {
            source: version.to_string(),
            sets: vec![vec![Comparator::new(Op::Eq, version.clone())]],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn comparator_sets(&self) -> &[Vec<Comparator>] {
        &self.sets
    }

    /// Whether `v` satisfies any comparator set.
    ///
    /// A pre-release only satisfies a set when some comparator in that set
    /// names the same `major.minor.patch` with a pre-release of its own.
    pub fn satisfies(&self, v: &Version) -> bool {
        self.sets.iter().any(|set| set_allows(set, v))
    }
}

fn set_allows(set: &[Comparator], v: &Version) -> bool {
    if !set.iter().all(|c| c.test(v)) {
        return false;
    }
    if !v.is_prerelease() {
        return true;
    }
    set.iter()
        .any(|c| c.version.is_prerelease() && c.version.triple() == v.triple())
}

/// The greatest version in `candidates` that satisfies `constraint`.
pub fn greatest_satisfying<'a, I>(candidates: I, constraint: &Constraint) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    candidates
        .into_iter()
        .filter(|v| constraint.satisfies(v))
        .max()
}

/// The newest candidate that satisfies `constraint` and is newer than
/// `current`, if any.
pub fn is_update_available<'a, I>(
    current: &Version,
    candidates: I,
    constraint: &Constraint,
) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    greatest_satisfying(candidates, constraint).filter(|best| *best > current)
}

/// A possibly partial version: `1`, `1.2`, `1.x`, `*`.
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Vec<PreId>,
}

impl Partial {
    fn parse(input: &str, s: &str) -> Result<Self, VersionError> {
        let s = s.strip_prefix('v').unwrap_or(s);
        if s.is_empty() {
            return Err(VersionError::new(input, "missing version"));
        }
        let wildcard = |p: &str| matches!(p, "x" | "X" | "*");
        let core_end = s.find(['-', '+']).unwrap_or(s.len());
        let (core, tail) = s.split_at(core_end);
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::new(input, "too many version components"));
        }
        let mut nums = [None, None, None];
        let mut seen_wild = false;
        for (i, part) in parts.iter().enumerate() {
            if wildcard(part) {
                seen_wild = true;
                continue;
            }
            if seen_wild {
                return Err(VersionError::new(input, "number after wildcard"));
            }
            nums[i] = Some(parse_number(input, part)?);
        }
        let pre = if tail.is_empty() {
            Vec::new()
        } else {
            if nums.iter().any(Option::is_none) {
                return Err(VersionError::new(input, "pre-release on a partial version"));
            }
            Version::parse(s)?.pre
        };
        Ok(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            pre,
        })
    }

    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    /// Lowest version the partial covers.
    fn floor(&self) -> Version {
        Version {
            pre: self.pre.clone(),
            ..Version::new(
                self.major.unwrap_or(0),
                self.minor.unwrap_or(0),
                self.patch.unwrap_or(0),
            )
        }
    }

    fn full(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(_), Some(_), Some(_)) => Some(self.floor()),
            _ => None,
        }
    }

    /// Exclusive upper bound of the partial's own range (`1.2` -> `1.3.0-0`).
    fn ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(ma), None, _) => Some(Version::floor_pre(ma + 1, 0, 0)),
            (Some(ma), Some(mi), None) => Some(Version::floor_pre(ma, mi + 1, 0)),
            _ => None,
        }
    }
}

fn parse_set(input: &str, set: &str) -> Result<Vec<Comparator>, VersionError> {
    if set.is_empty() {
        return Ok(Vec::new());
    }
    let tokens = tokenize(set);

    // hyphen range: `A - B`
    if tokens.len() == 3 && tokens[1] == "-" {
        let lo = Partial::parse(input, &tokens[0])?;
        let hi = Partial::parse(input, &tokens[2])?;
        let mut out = Vec::new();
        if !lo.is_any() {
            out.push(Comparator::new(Op::Gte, lo.floor()));
        }
        if let Some(v) = hi.full() {
            out.push(Comparator::new(Op::Lte, v));
        } else if let Some(v) = hi.ceiling() {
            out.push(Comparator::new(Op::Lt, v));
        }
        return Ok(out);
    }

    let mut out = Vec::new();
    for token in &tokens {
        if token == "-" {
            return Err(VersionError::new(input, "misplaced hyphen range"));
        }
        out.extend(desugar(input, token)?);
    }
    Ok(out)
}

/// Split on whitespace, joining an operator with a following version
/// (`>= 1.2.0` is the same as `>=1.2.0`).
fn tokenize(set: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;
    for word in set.split_whitespace() {
        if let Some(op) = pending.take() {
            tokens.push(format!("{}{}", op, word));
            continue;
        }
        if matches!(word, ">" | ">=" | "<" | "<=" | "=" | "^" | "~" | "~>") {
            pending = Some(word.to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    if let Some(op) = pending {
        tokens.push(op);
    }
    tokens
}

fn desugar(input: &str, token: &str) -> Result<Vec<Comparator>, VersionError> {
    if let Some(rest) = token.strip_prefix("~>").or_else(|| token.strip_prefix('~')) {
        return tilde(input, rest);
    }
    if let Some(rest) = token.strip_prefix('^') {
        return caret(input, rest);
    }
    for (prefix, op) in [(">=", Op::Gte), ("<=", Op::Lte), (">", Op::Gt), ("<", Op::Lt)] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return comparison(input, op, rest);
        }
    }
    let rest = token.strip_prefix('=').unwrap_or(token);
    let p = Partial::parse(input, rest)?;
    if p.is_any() {
        return Ok(Vec::new());
    }
    Ok(match (p.full(), p.ceiling()) {
        (Some(v), _) => vec![Comparator::new(Op::Eq, v)],
        (None, Some(ceiling)) => vec![
            Comparator::new(Op::Gte, p.floor()),
            Comparator::new(Op::Lt, ceiling),
        ],
        (None, None) => Vec::new(),
    })
}

fn tilde(input: &str, rest: &str) -> Result<Vec<Comparator>, VersionError> {
    let p = Partial::parse(input, rest)?;
    let Some(major) = p.major else {
        return Ok(Vec::new());
    };
    let upper = match p.minor {
        Some(minor) => Version::floor_pre(major, minor + 1, 0),
        None => Version::floor_pre(major + 1, 0, 0),
    };
    Ok(vec![
        Comparator::new(Op::Gte, p.floor()),
        Comparator::new(Op::Lt, upper),
    ])
}

fn caret(input: &str, rest: &str) -> Result<Vec<Comparator>, VersionError> {
    let p = Partial::parse(input, rest)?;
    let Some(major) = p.major else {
        return Ok(Vec::new());
    };
    let upper = match (major, p.minor, p.patch) {
        (0, None, _) => Version::floor_pre(1, 0, 0),
        (0, Some(0), None) => Version::floor_pre(0, 1, 0),
        (0, Some(0), Some(patch)) => Version::floor_pre(0, 0, patch + 1),
        (0, Some(minor), _) => Version::floor_pre(0, minor + 1, 0),
        (major, _, _) => Version::floor_pre(major + 1, 0, 0),
    };
    Ok(vec![
        Comparator::new(Op::Gte, p.floor()),
        Comparator::new(Op::Lt, upper),
    ])
}

fn comparison(input: &str, op: Op, rest: &str) -> Result<Vec<Comparator>, VersionError> {
    let p = Partial::parse(input, rest)?;
    if p.is_any() {
        // `>=*` matches anything; `<*` and `>*` match nothing.
        return Ok(match op {
            Op::Gte | Op::Lte | Op::Eq => Vec::new(),
            Op::Gt | Op::Lt => vec![Comparator::new(Op::Lt, Version::floor_pre(0, 0, 0))],
        });
    }
    if let Some(v) = p.full() {
        return Ok(vec![Comparator::new(op, v)]);
    }
    let floor = p.floor();
    let ceiling = p.ceiling().unwrap_or_else(|| floor.clone());
    Ok(vec![match op {
        // `>1.2` means above the whole 1.2 range
        Op::Gt => Comparator::new(Op::Gte, strip_pre(ceiling)),
        Op::Gte => Comparator::new(Op::Gte, floor),
        Op::Lt => Comparator::new(Op::Lt, Version::floor_pre(floor.major, floor.minor, 0)),
        Op::Lte => Comparator::new(Op::Lt, ceiling),
        Op::Eq => Comparator::new(Op::Gte, floor),
    }])
}

fn strip_pre(mut v: Version) -> Version {
    v.pre.clear();
    v
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Constraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Constraint::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
