// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable JSON files under `.gitvan/state`.
//!
//! Writes go to a `.tmp` sibling, are fsynced, then renamed over the target.
//! A file that no longer parses is moved aside to `.bak` and treated as
//! absent so the caller can start fresh.

use gv_core::ErrorKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Filesystem
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomically replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp).map_err(|e| PersistError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes)
            .map_err(|e| PersistError::io(&tmp, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| PersistError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| PersistError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| PersistError::io(path, e))
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Load JSON from `path`.
///
/// `Ok(None)` when the file is missing or corrupt; a corrupt file is
/// rotated to `.bak` first.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistError::io(path, e)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let bak = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak.display(),
                "corrupt state file, moving to .bak",
            );
            fs::rename(path, &bak).map_err(|e| PersistError::io(path, e))?;
            Ok(None)
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

const MAX_BAK_FILES: u32 = 3;

/// Next `.bak` path, shifting `.bak` → `.bak.2` → `.bak.3` and dropping the
/// oldest.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        if n == 1 {
            name.push(".bak");
        } else {
            name.push(format!(".bak.{n}"));
        }
        path.with_file_name(name)
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
