// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path globs: `*` matches any run of characters (including `/`), and a
//! `**/` segment may also match no directory at all.

use regex::Regex;

/// Translate a glob into an anchored regex source.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut rest = glob;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**/") {
            out.push_str("(?:.*/)?");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            out.push_str(".*");
            rest = tail.trim_start_matches('*');
        } else {
            let end = rest.find('*').unwrap_or(rest.len());
            out.push_str(&regex::escape(&rest[..end]));
            rest = &rest[end..];
        }
    }
    out.push('$');
    out
}

/// Compile a glob.
pub fn compile_glob(glob: &str) -> Result<Regex, regex::Error> {
    Regex::new(&glob_to_regex(glob))
}

/// One-shot match; an uncompilable glob matches nothing.
pub fn glob_matches(glob: &str, path: &str) -> bool {
    compile_glob(glob).map(|re| re.is_match(path)).unwrap_or(false)
}

#[cfg(test)]
#[path = "glob_tests.rs"]
mod tests;
