// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and event definition files (TOML, HCL, and JSON)

use crate::cron::{CronError, CronExpr};
use crate::predicate::{CompiledPredicate, Predicate, PredicateError};
use gv_core::{content_hash, parse_duration, ErrorKind, ExecOptions, JobId, JobKind, JobMeta};
use gv_core::job::{MAX_PRIORITY, MAX_RETRIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Definition file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Format {
    Toml,
    Hcl,
    Json,
}

/// Errors that can occur while loading a definition
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {location}: {message}")]
    Invalid { location: String, message: String },

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error(transparent)]
    Cron(#[from] CronError),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }

    fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::Invalid {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// One declarative step of a job or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepDef {
    /// Shell command run in the worktree with the job env.
    Shell {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        command: String,
    },
    /// Render `content` into a worktree file and report it as an artifact.
    Write {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        path: String,
        content: String,
    },
}

impl StepDef {
    /// Display label: the explicit name, else `step[i]`.
    pub fn label(&self, index: usize) -> String {
        let name = match self {
            StepDef::Shell { name, .. } | StepDef::Write { name, .. } => name,
        };
        name.clone().unwrap_or_else(|| format!("step[{}]", index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobAction {
    Steps(Vec<StepDef>),
    /// Name of a handler registered with the engine.
    Handler(String),
}

/// A validated job definition.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub id: JobId,
    pub kind: JobKind,
    pub cron: Option<CronExpr>,
    pub predicate: Option<Predicate>,
    pub compiled: Option<Arc<CompiledPredicate>>,
    pub meta: JobMeta,
    pub options: ExecOptions,
    pub action: JobAction,
    pub source: PathBuf,
    /// SHA-256 of the file contents.
    pub content_hash: String,
}

impl JobDefinition {
    pub fn version(&self) -> &str {
        &self.meta.version
    }

    pub fn priority(&self) -> u8 {
        self.meta.priority
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventAction {
    /// Run the named job with an event trigger.
    Job(JobId),
    Steps(Vec<StepDef>),
}

/// A validated event definition: a predicate bound to an action.
#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub id: String,
    pub predicate: Predicate,
    pub compiled: Arc<CompiledPredicate>,
    pub action: EventAction,
    pub priority: u8,
    pub desc: Option<String>,
    pub source: PathBuf,
    pub content_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    shell: Option<String>,
    #[serde(default)]
    write: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsFile {
    #[serde(default)]
    timeout: Option<String>,
    #[serde(default)]
    retries: u8,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    meta: Option<JobMeta>,
    #[serde(default)]
    cron: Option<String>,
    #[serde(default)]
    on: Option<Predicate>,
    #[serde(default)]
    options: OptionsFile,
    #[serde(default)]
    run: Option<Vec<StepFile>>,
    #[serde(default)]
    handler: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    on: Option<Predicate>,
    #[serde(default)]
    job: Option<String>,
    #[serde(default)]
    run: Option<Vec<StepFile>>,
    #[serde(default)]
    priority: u8,
    #[serde(default)]
    desc: Option<String>,
}

fn decode<T: serde::de::DeserializeOwned>(content: &str, format: Format) -> Result<T, ParseError> {
    Ok(match format {
        Format::Toml => toml::from_str(content)?,
        Format::Hcl => hcl::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    })
}

fn resolve_id(explicit: Option<String>, fallback: &str) -> Result<String, ParseError> {
    let id = explicit.unwrap_or_else(|| fallback.to_string());
    if id.trim().is_empty() {
        return Err(ParseError::invalid("id", "must not be empty"));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(ParseError::invalid("id", format!("{:?} contains whitespace", id)));
    }
    Ok(id)
}

fn convert_steps(steps: Vec<StepFile>) -> Result<Vec<StepDef>, ParseError> {
    if steps.is_empty() {
        return Err(ParseError::invalid("run", "step list is empty"));
    }
    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let location = format!("run[{}]", i);
            match (step.shell, step.write, step.content) {
                (Some(command), None, None) => {
                    if command.trim().is_empty() {
                        return Err(ParseError::invalid(location, "shell command is empty"));
                    }
                    Ok(StepDef::Shell {
                        name: step.name,
                        command,
                    })
                }
                (None, Some(path), Some(content)) => {
                    let p = Path::new(&path);
                    if path.is_empty()
                        || p.is_absolute()
                        || p.components().any(|c| c == std::path::Component::ParentDir)
                    {
                        return Err(ParseError::invalid(
                            location,
                            format!("write path {:?} must be relative to the worktree", path),
                        ));
                    }
                    Ok(StepDef::Write {
                        name: step.name,
                        path,
                        content,
                    })
                }
                (None, Some(_), None) => Err(ParseError::invalid(location, "write needs content")),
                _ => Err(ParseError::invalid(
                    location,
                    "expected exactly one of `shell` or `write` + `content`",
                )),
            }
        })
        .collect()
}

fn convert_options(file: OptionsFile) -> Result<ExecOptions, ParseError> {
    if file.retries > MAX_RETRIES {
        return Err(ParseError::invalid(
            "options.retries",
            format!("{} exceeds the maximum of {}", file.retries, MAX_RETRIES),
        ));
    }
    let timeout_ms = match file.timeout {
        Some(text) => {
            let d = parse_duration(&text)
                .map_err(|e| ParseError::invalid("options.timeout", e))?;
            if d.is_zero() {
                return Err(ParseError::invalid("options.timeout", "must be positive"));
            }
            Some(d.as_millis() as u64)
        }
        None => None,
    };
    Ok(ExecOptions {
        timeout_ms,
        retries: file.retries,
        parallel: file.parallel,
        env: file.env,
        cwd: file.cwd,
    })
}

/// Parse and validate one job file.
///
/// `fallback_id` is used when the file carries no explicit `id`.
pub fn parse_job_with_format(
    content: &str,
    format: Format,
    fallback_id: &str,
    source: &Path,
) -> Result<JobDefinition, ParseError> {
    let file: JobFile = decode(content, format)?;

    let id = resolve_id(file.id, fallback_id)?;
    let meta = file.meta.unwrap_or_else(JobMeta::new);
    if meta.priority > MAX_PRIORITY {
        return Err(ParseError::invalid(
            "meta.priority",
            format!("{} exceeds the maximum of {}", meta.priority, MAX_PRIORITY),
        ));
    }
    if meta.version.trim().is_empty() {
        return Err(ParseError::invalid("meta.version", "must not be empty"));
    }

    let (kind, cron, predicate) = match (file.cron, file.on) {
        (Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                "job",
                "`cron` and `on` are mutually exclusive",
            ))
        }
        (Some(expr), None) => (JobKind::Cron, Some(CronExpr::parse(&expr)?), None),
        (None, Some(on)) => (JobKind::Event, None, Some(on)),
        (None, None) => (JobKind::OnDemand, None, None),
    };
    let compiled = predicate
        .as_ref()
        .map(|p| p.compile().map(Arc::new))
        .transpose()?;

    let action = match (file.run, file.handler) {
        (Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                "job",
                "`run` and `handler` are mutually exclusive",
            ))
        }
        (Some(steps), None) => JobAction::Steps(convert_steps(steps)?),
        (None, Some(handler)) if !handler.trim().is_empty() => JobAction::Handler(handler),
        (None, Some(_)) => return Err(ParseError::invalid("handler", "must not be empty")),
        (None, None) => return Err(ParseError::invalid("job", "nothing to run")),
    };

    Ok(JobDefinition {
        id: JobId::new(id),
        kind,
        cron,
        predicate,
        compiled,
        meta,
        options: convert_options(file.options)?,
        action,
        source: source.to_path_buf(),
        content_hash: content_hash(content.as_bytes()),
    })
}

/// Parse and validate one event file.
///
/// `implied` is the predicate derived from the file's location, used when
/// the file has no `on` of its own.
pub fn parse_event_with_format(
    content: &str,
    format: Format,
    fallback_id: &str,
    source: &Path,
    implied: Option<Predicate>,
) -> Result<EventDefinition, ParseError> {
    let file: EventFile = decode(content, format)?;

    let id = resolve_id(file.id, fallback_id)?;
    if file.priority > MAX_PRIORITY {
        return Err(ParseError::invalid(
            "priority",
            format!("{} exceeds the maximum of {}", file.priority, MAX_PRIORITY),
        ));
    }
    let predicate = file
        .on
        .or(implied)
        .ok_or_else(|| ParseError::invalid("on", "event has no predicate"))?;
    let compiled = Arc::new(predicate.compile()?);

    let action = match (file.job, file.run) {
        (Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                "event",
                "`job` and `run` are mutually exclusive",
            ))
        }
        (Some(job), None) => resolve_id(Some(job), "").map(|j| EventAction::Job(JobId::new(j)))?,
        (None, Some(steps)) => EventAction::Steps(convert_steps(steps)?),
        (None, None) => return Err(ParseError::invalid("event", "nothing to run")),
    };

    Ok(EventDefinition {
        id,
        predicate,
        compiled,
        action,
        priority: file.priority,
        desc: file.desc,
        source: source.to_path_buf(),
        content_hash: content_hash(content.as_bytes()),
    })
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
