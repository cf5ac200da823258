// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a table, or `empty` when it has no rows.
pub fn print_table(table: &crate::table::Table, empty: &str) {
    if table.is_empty() {
        println!("{}", empty);
    } else {
        table.render(&mut std::io::stdout());
    }
}

/// Shorten a SHA or fingerprint for display.
pub fn short(id: &str, len: usize) -> &str {
    let end = id
        .char_indices()
        .nth(len)
        .map_or(id.len(), |(i, _)| i);
    &id[..end]
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
