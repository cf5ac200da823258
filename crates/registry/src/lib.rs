// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Job and event definitions: predicates, cron expressions, discovery, catalog

mod catalog;
mod cron;
mod definition;
mod find;
mod glob;
mod predicate;
mod template;

pub use catalog::{Catalog, Registry, ScanReport};
pub use cron::{CronError, CronExpr};
pub use definition::{
    parse_event_with_format, parse_job_with_format, EventAction, EventDefinition, Format,
    JobAction, JobDefinition, ParseError, StepDef,
};
pub use find::{collect_definition_files, derive_id, format_for_path, predicate_from_path};
pub use glob::{glob_matches, glob_to_regex};
pub use predicate::{CompiledPredicate, Predicate, PredicateError};
pub use template::{escape_for_shell, interpolate, interpolate_shell};
