// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event predicate language.
//!
//! A [`Predicate`] is the serde model of the on-disk schema (camelCase keys,
//! unknown keys rejected). [`Predicate::compile`] validates it and compiles
//! every regex once; [`CompiledPredicate::evaluate`] is then a pure, infallible
//! function of the metadata.
//!
//! Semantics: leaf matchers are OR-ed together; `any` is a disjunction and
//! `all` a conjunction of sub-predicates. When several of these components
//! are present they are AND-ed. A predicate with no components is `false`.

use crate::glob::compile_glob;
use gv_core::EventMetadata;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// `vMAJOR.MINOR.PATCH` with optional pre-release and build metadata.
#[allow(clippy::expect_used)]
static SEMVER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("constant regex pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("{field}: predicate has no matchers")]
    Empty { field: String },
    #[error("{field}: pattern list is empty")]
    EmptyList { field: String },
    #[error("{field}: invalid pattern {value:?}: {reason}")]
    Pattern {
        field: String,
        value: String,
        reason: String,
    },
    #[error("invalid predicate: {0}")]
    Schema(String),
}

/// On-disk predicate schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Predicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<Predicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<Predicate>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_changed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_added: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_modified: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_deleted: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver_tag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_suffix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_scope: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileSet {
    Changed,
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
enum Leaf {
    Paths(FileSet, Vec<Regex>),
    TagCreate(Regex),
    SemverTag,
    TagPrefix(String),
    TagSuffix(String),
    MergeTo(String),
    /// `None` matches any branch creation.
    BranchCreate(Option<Regex>),
    /// `None` matches any merge source.
    MergeFrom(Option<Regex>),
    PullRequest,
    Message(Regex),
    AuthorEmail(Regex),
    AuthorName(Regex),
    Signed,
    CommitType(Regex),
    CommitScope(Regex),
}

/// A validated predicate with every pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    any: Option<Vec<CompiledPredicate>>,
    all: Option<Vec<CompiledPredicate>>,
    leaves: Vec<Leaf>,
}

impl Predicate {
    /// Parse from a JSON value, rejecting unknown keys.
    pub fn from_json(value: serde_json::Value) -> Result<Self, PredicateError> {
        serde_json::from_value(value).map_err(|e| PredicateError::Schema(e.to_string()))
    }

    /// Validate and compile.
    pub fn compile(&self) -> Result<CompiledPredicate, PredicateError> {
        self.compile_at("on")
    }

    fn has_leaves(&self) -> bool {
        self.path_changed.is_some()
            || self.path_added.is_some()
            || self.path_modified.is_some()
            || self.path_deleted.is_some()
            || self.tag_create.is_some()
            || self.semver_tag == Some(true)
            || self.tag_prefix.is_some()
            || self.tag_suffix.is_some()
            || self.merge_to.is_some()
            || self.branch_create.is_some()
            || self.merge_from.is_some()
            || self.pull_request == Some(true)
            || self.message.is_some()
            || self.author_email.is_some()
            || self.author_name.is_some()
            || self.signed == Some(true)
            || self.commit_type.is_some()
            || self.commit_scope.is_some()
    }

    fn compile_at(&self, field: &str) -> Result<CompiledPredicate, PredicateError> {
        let empty = |list: &Option<Vec<Predicate>>| list.as_ref().map_or(true, Vec::is_empty);
        if !self.has_leaves() && empty(&self.any) && empty(&self.all) {
            return Err(PredicateError::Empty {
                field: field.to_string(),
            });
        }

        let children = |name: &str, list: &Option<Vec<Predicate>>| {
            list.as_ref()
                .map(|items| {
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, p)| p.compile_at(&format!("{}.{}[{}]", field, name, i)))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()
        };
        let any = children("any", &self.any)?;
        let all = children("all", &self.all)?;

        let mut leaves = Vec::new();
        let at = |key: &str| format!("{}.{}", field, key);

        for (key, set, globs) in [
            ("pathChanged", FileSet::Changed, &self.path_changed),
            ("pathAdded", FileSet::Added, &self.path_added),
            ("pathModified", FileSet::Modified, &self.path_modified),
            ("pathDeleted", FileSet::Deleted, &self.path_deleted),
        ] {
            if let Some(globs) = globs {
                if globs.is_empty() {
                    return Err(PredicateError::EmptyList { field: at(key) });
                }
                let compiled = globs
                    .iter()
                    .map(|g| {
                        compile_glob(g).map_err(|e| PredicateError::Pattern {
                            field: at(key),
                            value: g.clone(),
                            reason: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                leaves.push(Leaf::Paths(set, compiled));
            }
        }

        if let Some(p) = &self.tag_create {
            leaves.push(Leaf::TagCreate(regex(&at("tagCreate"), p, false)?));
        }
        if self.semver_tag == Some(true) {
            leaves.push(Leaf::SemverTag);
        }
        if let Some(p) = &self.tag_prefix {
            leaves.push(Leaf::TagPrefix(p.clone()));
        }
        if let Some(p) = &self.tag_suffix {
            leaves.push(Leaf::TagSuffix(p.clone()));
        }
        if let Some(p) = &self.merge_to {
            leaves.push(Leaf::MergeTo(p.clone()));
        }
        if let Some(p) = &self.branch_create {
            leaves.push(Leaf::BranchCreate(optional_regex(&at("branchCreate"), p)?));
        }
        if let Some(p) = &self.merge_from {
            leaves.push(Leaf::MergeFrom(optional_regex(&at("mergeFrom"), p)?));
        }
        if self.pull_request == Some(true) {
            leaves.push(Leaf::PullRequest);
        }
        if let Some(p) = &self.message {
            leaves.push(Leaf::Message(regex(&at("message"), p, true)?));
        }
        if let Some(p) = &self.author_email {
            leaves.push(Leaf::AuthorEmail(regex(&at("authorEmail"), p, true)?));
        }
        if let Some(p) = &self.author_name {
            leaves.push(Leaf::AuthorName(regex(&at("authorName"), p, true)?));
        }
        if self.signed == Some(true) {
            leaves.push(Leaf::Signed);
        }
        if let Some(p) = &self.commit_type {
            let source = format!(r"^(?:{})(\(.*\))?:", p);
            leaves.push(Leaf::CommitType(regex(&at("commitType"), &source, true)?));
        }
        if let Some(p) = &self.commit_scope {
            let source = format!(r"^\w+\((?:{})\):", p);
            leaves.push(Leaf::CommitScope(regex(&at("commitScope"), &source, true)?));
        }

        Ok(CompiledPredicate { any, all, leaves })
    }
}

fn regex(field: &str, pattern: &str, case_insensitive: bool) -> Result<Regex, PredicateError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| PredicateError::Pattern {
            field: field.to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn optional_regex(field: &str, pattern: &str) -> Result<Option<Regex>, PredicateError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    regex(field, pattern, false).map(Some)
}

impl Leaf {
    fn matches(&self, m: &EventMetadata) -> bool {
        let text = |field: &Option<String>, re: &Regex| field.as_deref().is_some_and(|s| re.is_match(s));
        match self {
            Leaf::Paths(set, globs) => {
                let files = match set {
                    FileSet::Changed => &m.files_changed,
                    FileSet::Added => &m.files_added,
                    FileSet::Modified => &m.files_modified,
                    FileSet::Deleted => &m.files_deleted,
                };
                files.iter().any(|f| globs.iter().any(|g| g.is_match(f)))
            }
            Leaf::TagCreate(re) => m.tags_created.iter().any(|t| re.is_match(t)),
            Leaf::SemverTag => m.tags_created.iter().any(|t| SEMVER_TAG.is_match(t)),
            Leaf::TagPrefix(p) => m.tags_created.iter().any(|t| t.starts_with(p.as_str())),
            Leaf::TagSuffix(s) => m.tags_created.iter().any(|t| t.ends_with(s.as_str())),
            Leaf::MergeTo(branch) => m.merged_to.as_deref() == Some(branch.as_str()),
            Leaf::BranchCreate(re) => match (&m.branch_created, re) {
                (Some(_), None) => true,
                (Some(b), Some(re)) => re.is_match(b),
                (None, _) => false,
            },
            Leaf::MergeFrom(re) => match (&m.merged_from, re) {
                (Some(_), None) => true,
                (Some(b), Some(re)) => re.is_match(b),
                (None, _) => false,
            },
            Leaf::PullRequest => m.pull_request.is_some(),
            Leaf::Message(re) | Leaf::CommitType(re) | Leaf::CommitScope(re) => {
                text(&m.message, re)
            }
            Leaf::AuthorEmail(re) => text(&m.author_email, re),
            Leaf::AuthorName(re) => text(&m.author_name, re),
            Leaf::Signed => m.signed,
        }
    }
}

impl CompiledPredicate {
    /// Pure evaluation; never fails.
    pub fn evaluate(&self, meta: &EventMetadata) -> bool {
        let mut present = false;
        if let Some(any) = &self.any {
            present = true;
            if !any.iter().any(|p| p.evaluate(meta)) {
                return false;
            }
        }
        if let Some(all) = &self.all {
            present = true;
            if !all.iter().all(|p| p.evaluate(meta)) {
                return false;
            }
        }
        if !self.leaves.is_empty() {
            present = true;
            if !self.leaves.iter().any(|l| l.matches(meta)) {
                return false;
            }
        }
        present
    }

    /// Number of leaf matchers at this level.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
