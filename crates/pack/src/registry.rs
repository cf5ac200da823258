// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sources of installable pack versions.

use crate::error::PackError;
use crate::spec::PackSpec;
use crate::version::Version;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Lists and loads published pack versions.
pub trait PackRegistry {
    /// Every published version of `id`, unordered. Unknown ids yield none.
    fn versions(&self, id: &str) -> Result<Vec<Version>, PackError>;

    fn load(&self, id: &str, version: &Version) -> Result<PackSpec, PackError>;
}

/// Registry laid out as `<root>/<id>/<version>/pack.toml`.
#[derive(Debug, Clone)]
pub struct DirRegistry {
    root: PathBuf,
}

impl DirRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackRegistry for DirRegistry {
    fn versions(&self, id: &str) -> Result<Vec<Version>, PackError> {
        let dir = self.root.join(id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PackError::io(dir, e)),
        };
        let mut versions = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match Version::parse(name) {
                Ok(v) => versions.push(v),
                Err(e) => tracing::debug!(pack = id, dir = name, error = %e, "skipping non-version directory"),
            }
        }
        Ok(versions)
    }

    fn load(&self, id: &str, version: &Version) -> Result<PackSpec, PackError> {
        let dir = self.root.join(id).join(version.to_string());
        let spec = PackSpec::load(&dir)?;
        if spec.id.as_str() != id || &spec.version != version {
            return Err(PackError::invalid(
                dir.display().to_string(),
                format!(
                    "manifest declares {}@{}, expected {}@{}",
                    spec.id, spec.version, id, version
                ),
            ));
        }
        Ok(spec)
    }
}

/// In-memory registry, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    packs: HashMap<String, BTreeMap<Version, PackSpec>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: PackSpec) {
        self.packs
            .entry(spec.id.as_str().to_string())
            .or_default()
            .insert(spec.version.clone(), spec);
    }

    pub fn with(mut self, spec: PackSpec) -> Self {
        self.insert(spec);
        self
    }
}

impl PackRegistry for MemoryRegistry {
    fn versions(&self, id: &str) -> Result<Vec<Version>, PackError> {
        Ok(self
            .packs
            .get(id)
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn load(&self, id: &str, version: &Version) -> Result<PackSpec, PackError> {
        self.packs
            .get(id)
            .and_then(|v| v.get(version))
            .cloned()
            .ok_or_else(|| PackError::Unresolved {
                id: id.to_string(),
                constraint: version.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
