// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pack manifests (`pack.toml` / `pack.json`).
//!
//! ```toml
//! id = "changelog"
//! version = "1.2.0"
//!
//! [dependencies]
//! base = "^1.0.0"
//!
//! [options.project]
//! default = "demo"
//!
//! [[transforms]]
//! op = "create"
//! path = "CHANGELOG.md"
//! content = "# ${project}\n"
//! ```

use crate::constraint::Constraint;
use crate::error::PackError;
use crate::version::Version;
use gv_core::{content_hash, PackId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Manifest file names, in lookup order.
pub const MANIFEST_FILES: [&str; 2] = ["pack.toml", "pack.json"];

/// A declared option. Options without a default are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One file operation. Paths and text are templates over the pack options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Transform {
    /// Create or replace a file.
    Write { path: String, content: String },
    /// Create a file that must not exist yet.
    Create { path: String, content: String },
    /// Append to a file, creating it when missing.
    Append { path: String, content: String },
    Delete { path: String },
    /// Deep-merge `value` into a JSON object file.
    JsonMerge { path: String, value: Value },
}

impl Transform {
    pub fn path(&self) -> &str {
        match self {
            Transform::Write { path, .. }
            | Transform::Create { path, .. }
            | Transform::Append { path, .. }
            | Transform::Delete { path }
            | Transform::JsonMerge { path, .. } => path,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Transform::Write { .. } => "write",
            Transform::Create { .. } => "create",
            Transform::Append { .. } => "append",
            Transform::Delete { .. } => "delete",
            Transform::JsonMerge { .. } => "json-merge",
        }
    }
}

/// A validated pack manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSpec {
    pub id: PackId,
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dependencies: BTreeMap<String, Constraint>,
    pub peer_dependencies: BTreeMap<String, Constraint>,
    pub dev_dependencies: BTreeMap<String, Constraint>,
    pub options: BTreeMap<String, OptionDef>,
    pub transforms: Vec<Transform>,
    /// Directory the manifest was loaded from, if any.
    #[serde(skip)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum TransformOp {
    Write,
    Create,
    Append,
    Delete,
    JsonMerge,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransformFile {
    op: TransformOp,
    path: String,
    #[serde(default)]
    content: Option<String>,
    /// File inside the pack directory used as content.
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PackFile {
    id: String,
    version: Version,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, Constraint>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, Constraint>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, Constraint>,
    #[serde(default)]
    options: BTreeMap<String, OptionDef>,
    #[serde(default)]
    transforms: Vec<TransformFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl PackSpec {
    /// Load the manifest in `dir`.
    pub fn load(dir: &Path) -> Result<Self, PackError> {
        for (name, format) in MANIFEST_FILES
            .iter()
            .zip([ManifestFormat::Toml, ManifestFormat::Json])
        {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let mut spec = Self::parse(&content, format, &path, Some(dir))?;
                    spec.dir = Some(dir.to_path_buf());
                    return Ok(spec);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(PackError::io(path, e)),
            }
        }
        Err(PackError::invalid(
            dir.display().to_string(),
            format!("no {} or {} found", MANIFEST_FILES[0], MANIFEST_FILES[1]),
        ))
    }

    /// Parse manifest text. `template` transforms are read relative to
    /// `base_dir` and fail without one.
    pub fn parse(
        content: &str,
        format: ManifestFormat,
        source: &Path,
        base_dir: Option<&Path>,
    ) -> Result<Self, PackError> {
        let parse_err = |message: String| PackError::Parse {
            path: source.to_path_buf(),
            message,
        };
        let file: PackFile = match format {
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
            ManifestFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
            }
        };

        if file.id.trim().is_empty() || file.id.chars().any(char::is_whitespace) {
            return Err(PackError::invalid("id", format!("invalid pack id {:?}", file.id)));
        }
        let mut transforms = Vec::with_capacity(file.transforms.len());
        for (i, raw) in file.transforms.into_iter().enumerate() {
            transforms.push(convert_transform(i, raw, base_dir)?);
        }

        Ok(Self {
            id: PackId::new(file.id),
            version: file.version,
            description: file.description,
            dependencies: file.dependencies,
            peer_dependencies: file.peer_dependencies,
            dev_dependencies: file.dev_dependencies,
            options: file.options,
            transforms,
            dir: None,
        })
    }

    /// Merge `provided` over declared defaults.
    ///
    /// Missing required options fail; undeclared ones are dropped with a
    /// warning.
    pub fn resolve_options(
        &self,
        provided: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, PackError> {
        let mut values = BTreeMap::new();
        for (name, def) in &self.options {
            match provided.get(name).or(def.default.as_ref()) {
                Some(v) => {
                    values.insert(name.clone(), v.clone());
                }
                None => {
                    return Err(PackError::MissingOption {
                        pack_id: self.id.clone(),
                        name: name.clone(),
                    })
                }
            }
        }
        for name in provided.keys() {
            if !self.options.contains_key(name) {
                tracing::warn!(pack_id = %self.id, option = %name, "ignoring undeclared pack option");
            }
        }
        Ok(values)
    }

    /// SHA-256 over id, version, transforms, and resolved options.
    pub fn fingerprint(&self, options: &BTreeMap<String, String>) -> String {
        let canonical = serde_json::json!({
            "id": self.id.as_str(),
            "version": self.version.to_string(),
            "transforms": self.transforms,
            "options": options,
        });
        content_hash(canonical.to_string().as_bytes())
    }

    /// Every dependency edge: direct, then peer, then (when asked) dev.
    pub fn dependency_edges(&self, include_dev: bool) -> Vec<(&str, &Constraint)> {
        let dev = include_dev.then_some(&self.dev_dependencies);
        self.dependencies
            .iter()
            .chain(&self.peer_dependencies)
            .chain(dev.into_iter().flatten())
            .map(|(id, c)| (id.as_str(), c))
            .collect()
    }
}

fn convert_transform(
    index: usize,
    raw: TransformFile,
    base_dir: Option<&Path>,
) -> Result<Transform, PackError> {
    let location = format!("transforms[{}]", index);
    validate_path(&location, &raw.path)?;

    let text = |raw: &TransformFile| -> Result<String, PackError> {
        match (&raw.content, &raw.template) {
            (Some(content), None) => Ok(content.clone()),
            (None, Some(template)) => read_template(&location, template, base_dir),
            (Some(_), Some(_)) => Err(PackError::invalid(
                &location,
                "content and template are mutually exclusive",
            )),
            (None, None) => Err(PackError::invalid(&location, "needs content or template")),
        }
    };
    let no_value = |raw: &TransformFile| {
        if raw.value.is_some() {
            Err(PackError::invalid(&location, "value is only valid for json-merge"))
        } else {
            Ok(())
        }
    };

    Ok(match raw.op {
        TransformOp::Write => {
            no_value(&raw)?;
            Transform::Write {
                content: text(&raw)?,
                path: raw.path,
            }
        }
        TransformOp::Create => {
            no_value(&raw)?;
            Transform::Create {
                content: text(&raw)?,
                path: raw.path,
            }
        }
        TransformOp::Append => {
            no_value(&raw)?;
            Transform::Append {
                content: text(&raw)?,
                path: raw.path,
            }
        }
        TransformOp::Delete => {
            if raw.content.is_some() || raw.template.is_some() || raw.value.is_some() {
                return Err(PackError::invalid(&location, "delete takes only a path"));
            }
            Transform::Delete { path: raw.path }
        }
        TransformOp::JsonMerge => {
            if raw.content.is_some() || raw.template.is_some() {
                return Err(PackError::invalid(&location, "json-merge takes a value"));
            }
            match raw.value {
                Some(value @ Value::Object(_)) => Transform::JsonMerge {
                    path: raw.path,
                    value,
                },
                _ => return Err(PackError::invalid(&location, "json-merge value must be an object")),
            }
        }
    })
}

/// Paths must stay inside the worktree.
pub(crate) fn validate_path(location: &str, path: &str) -> Result<(), PackError> {
    let p = Path::new(path);
    let contained = !path.trim().is_empty()
        && p.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if contained {
        Ok(())
    } else {
        Err(PackError::invalid(
            location,
            format!("path {:?} must be relative to the worktree", path),
        ))
    }
}

fn read_template(location: &str, template: &str, base_dir: Option<&Path>) -> Result<String, PackError> {
    validate_path(location, template)?;
    let Some(base) = base_dir else {
        return Err(PackError::invalid(location, "template needs a pack directory"));
    };
    let path = base.join(template);
    std::fs::read_to_string(&path).map_err(|e| PackError::io(path, e))
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
