// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsers for git plumbing output.

use super::{ChangedFiles, CommitInfo, NoteEntry, RefHead, RefKind};
use std::path::PathBuf;

/// Field separator for `--format` strings.
pub const SEP: char = '\u{1f}';

/// `--format` used by [`parse_commit_info`].
pub const COMMIT_FORMAT: &str = "%H%x1f%an%x1f%ae%x1f%at%x1f%P%x1f%G?%x1f%B";

/// `--format` used by [`parse_refs`].
pub const REFS_FORMAT: &str = "%(refname)%09%(objectname)%09%(*objectname)";

/// Parse `--name-status -z` output.
pub fn parse_name_status_z(out: &str) -> ChangedFiles {
    let mut files = ChangedFiles::default();
    let mut fields = out.split('\0').filter(|f| !f.is_empty());
    while let Some(status) = fields.next() {
        let code = status.chars().next().unwrap_or(' ');
        match code {
            'R' | 'C' => {
                let (Some(from), Some(to)) = (fields.next(), fields.next()) else {
                    break;
                };
                if code == 'R' {
                    files.renamed.push((from.to_string(), to.to_string()));
                } else {
                    files.added.push(to.to_string());
                }
            }
            _ => {
                let Some(path) = fields.next() else {
                    break;
                };
                let path = path.to_string();
                match code {
                    'A' => files.added.push(path),
                    'D' => files.deleted.push(path),
                    _ => files.modified.push(path),
                }
            }
        }
    }
    files
}

/// Parse one commit rendered with [`COMMIT_FORMAT`].
pub fn parse_commit_info(out: &str) -> Option<CommitInfo> {
    let mut parts = out.splitn(7, SEP);
    let sha = parts.next()?.trim().to_string();
    let author_name = parts.next()?.to_string();
    let author_email = parts.next()?.to_string();
    let timestamp = parts.next()?.trim().parse().ok()?;
    let parents = parts
        .next()?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let signature = parts.next()?.chars().next().unwrap_or('N');
    let message = parts.next().unwrap_or("").trim_end().to_string();
    if sha.is_empty() {
        return None;
    }
    Some(CommitInfo {
        sha,
        author_name,
        author_email,
        timestamp,
        parents,
        signature,
        message,
    })
}

/// Parse `for-each-ref` output rendered with [`REFS_FORMAT`].
pub fn parse_refs(out: &str) -> Vec<RefHead> {
    out.lines()
        .filter_map(|line| {
            let mut cols = line.split('\t');
            let refname = cols.next()?;
            let object = cols.next()?;
            let peeled = cols.next().unwrap_or("");
            let (kind, name) = if let Some(name) = refname.strip_prefix("refs/heads/") {
                (RefKind::Branch, name)
            } else if let Some(name) = refname.strip_prefix("refs/tags/") {
                (RefKind::Tag, name)
            } else {
                return None;
            };
            let sha = if peeled.is_empty() { object } else { peeled };
            Some(RefHead {
                kind,
                name: name.to_string(),
                sha: sha.to_string(),
            })
        })
        .collect()
}

/// Parse `git notes list` output (`<note> <target>` per line).
pub fn parse_note_list(out: &str) -> Vec<NoteEntry> {
    out.lines()
        .filter_map(|line| {
            let (note, target) = line.trim().split_once(' ')?;
            Some(NoteEntry {
                note: note.to_string(),
                target: target.to_string(),
            })
        })
        .collect()
}

/// Parse `git worktree list --porcelain`.
pub fn parse_worktrees(out: &str) -> Vec<PathBuf> {
    out.lines()
        .filter_map(|line| line.strip_prefix("worktree "))
        .map(PathBuf::from)
        .collect()
}

/// Whether `s` looks like a full SHA-1 object id.
pub fn is_full_sha(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
