// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition file discovery and path conventions

use crate::definition::Format;
use crate::predicate::Predicate;
use std::path::{Component, Path, PathBuf};

/// Recursively collect definition files (`.toml`, `.hcl`, `.json`) under `dir`.
///
/// Hidden entries are skipped. A missing directory yields no files. The
/// result is sorted by path.
pub fn collect_definition_files(dir: &Path) -> Result<Vec<(PathBuf, Format)>, std::io::Error> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if let Some(format) = format_for_path(&path) {
                files.push((path, format));
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

pub fn format_for_path(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Some(Format::Toml),
        Some("hcl") => Some(Format::Hcl),
        Some("json") => Some(Format::Json),
        _ => None,
    }
}

fn relative_segments(root: &Path, path: &Path) -> Vec<String> {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Id derived from the path relative to its root: separators become dots
/// and the extension is dropped (`jobs/lint/changed.toml` → `lint.changed`).
pub fn derive_id(root: &Path, path: &Path) -> String {
    relative_segments(root, path).join(".")
}

/// Predicate implied by an event file's location under its root.
///
/// | Location                         | Predicate                   |
/// |----------------------------------|-----------------------------|
/// | `merge-to/<branch…>`             | `mergeTo = "<branch>"`      |
/// | `tag/semver`                     | `semverTag = true`          |
/// | `path-changed/<segments…>`       | `pathChanged = ["<glob>"]`  |
/// | `message/<regex>`                | `message = "<regex>"`       |
///
/// In `path-changed` globs, `[...name]` becomes `**` and `[name]` becomes `*`.
pub fn predicate_from_path(root: &Path, path: &Path) -> Option<Predicate> {
    let segments = relative_segments(root, path);
    let (head, rest) = segments.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let joined = rest.join("/");
    let predicate = match head.as_str() {
        "merge-to" => Predicate {
            merge_to: Some(joined),
            ..Predicate::default()
        },
        "tag" if joined == "semver" => Predicate {
            semver_tag: Some(true),
            ..Predicate::default()
        },
        "path-changed" => {
            let glob: Vec<String> = rest.iter().map(|s| slug_to_glob(s)).collect();
            Predicate {
                path_changed: Some(vec![glob.join("/")]),
                ..Predicate::default()
            }
        }
        "message" => Predicate {
            message: Some(joined),
            ..Predicate::default()
        },
        _ => return None,
    };
    Some(predicate)
}

fn slug_to_glob(segment: &str) -> String {
    match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) if inner.starts_with("...") => "**".to_string(),
        Some(_) => "*".to_string(),
        None => segment.to_string(),
    }
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
