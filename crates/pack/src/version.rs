// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SemVer 2.0 versions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version {input:?}: {reason}")]
pub struct VersionError {
    pub input: String,
    pub reason: String,
}

impl VersionError {
    pub(crate) fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// One dot-separated pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreId {
    Numeric(u64),
    Alpha(String),
}

impl Ord for PreId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PreId::Numeric(a), PreId::Numeric(b)) => a.cmp(b),
            (PreId::Numeric(_), PreId::Alpha(_)) => Ordering::Less,
            (PreId::Alpha(_), PreId::Numeric(_)) => Ordering::Greater,
            (PreId::Alpha(a), PreId::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PreId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreId::Numeric(n) => write!(f, "{}", n),
            PreId::Alpha(s) => f.write_str(s),
        }
    }
}

/// `major.minor.patch[-pre][+build]`. Build metadata is kept for display but
/// ignored by comparisons.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<PreId>,
    pub build: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: None,
        }
    }

    /// Parse a full version, allowing a leading `v` or `=`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let s = input.trim();
        let s = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('='))
            .unwrap_or(s);
        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => {
                validate_idents(input, build, false)?;
                (rest, Some(build.to_string()))
            }
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, parse_pre(input, pre)?),
            None => (rest, Vec::new()),
        };
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::new(input, "expected major.minor.patch"));
        }
        Ok(Self {
            major: parse_number(input, parts[0])?,
            minor: parse_number(input, parts[1])?,
            patch: parse_number(input, parts[2])?,
            pre,
            build,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// `(major, minor, patch)` without pre-release or build.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// The lowest pre-release of this triple (`x.y.z-0`).
    pub(crate) fn floor_pre(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            pre: vec![PreId::Numeric(0)],
            ..Self::new(major, minor, patch)
        }
    }
}

pub(crate) fn parse_number(input: &str, s: &str) -> Result<u64, VersionError> {
    if s.is_empty() {
        return Err(VersionError::new(input, "empty numeric component"));
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(VersionError::new(input, "leading zero in numeric component"));
    }
    s.parse()
        .map_err(|_| VersionError::new(input, format!("{:?} is not a number", s)))
}

fn validate_idents(input: &str, s: &str, numeric_rules: bool) -> Result<(), VersionError> {
    for ident in s.split('.') {
        if ident.is_empty() {
            return Err(VersionError::new(input, "empty identifier"));
        }
        if !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(VersionError::new(
                input,
                format!("invalid character in identifier {:?}", ident),
            ));
        }
        if numeric_rules
            && ident.len() > 1
            && ident.starts_with('0')
            && ident.chars().all(|c| c.is_ascii_digit())
        {
            return Err(VersionError::new(input, "leading zero in pre-release"));
        }
    }
    Ok(())
}

fn parse_pre(input: &str, s: &str) -> Result<Vec<PreId>, VersionError> {
    validate_idents(input, s, true)?;
    Ok(s.split('.')
        .map(|ident| match ident.parse::<u64>() {
            Ok(n) if ident.chars().all(|c| c.is_ascii_digit()) => PreId::Numeric(n),
            _ => PreId::Alpha(ident.to_string()),
        })
        .collect())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // a release sorts after all of its pre-releases
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
        self.pre.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(ToString::to_string).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
