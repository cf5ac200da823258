// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod cron;
pub mod daemon;
pub mod event;
pub mod job;
pub mod pack;
pub mod receipts;
