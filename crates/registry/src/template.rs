// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${name}` interpolation for step bodies and pack transforms.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `${name}` or `${scope.name}`
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)*)\}")
        .expect("constant regex pattern is valid")
});

/// `${NAME:-fallback}`
#[allow(clippy::expect_used)]
static DEFAULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+):-([^}]*)\}").expect("constant regex pattern is valid")
});

/// Backslash-escape `\ $ ` "` so a value is literal inside double quotes.
pub fn escape_for_shell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '$' | '`' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Replace `${name}` with values from `vars`.
///
/// `${NAME:-fallback}` is resolved first: from `vars`, then the process
/// environment, then the fallback text. Unknown `${name}` references are
/// left untouched so shell variables survive.
pub fn interpolate(template: &str, vars: &BTreeMap<String, String>) -> String {
    render(template, vars, false)
}

/// Like [`interpolate`] but escapes substituted values for double-quoted
/// shell contexts.
pub fn interpolate_shell(template: &str, vars: &BTreeMap<String, String>) -> String {
    render(template, vars, true)
}

fn render(template: &str, vars: &BTreeMap<String, String>, shell: bool) -> String {
    let escape = |v: &str| {
        if shell {
            escape_for_shell(v)
        } else {
            v.to_string()
        }
    };

    let defaulted = DEFAULT_PATTERN.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(v) => escape(v),
            None => std::env::var(name).unwrap_or_else(|_| caps[2].to_string()),
        }
    });

    VAR_PATTERN
        .replace_all(&defaulted, |caps: &Captures| match vars.get(&caps[1]) {
            Some(v) => escape(v),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
