// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands
//!
//! JSON output is one object per line: `"type":"openat"` for events and
//! `"type":"stats"` for reader counters.

use clap::ValueEnum;
use oscope_core::{Event, ReaderStats};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct EventRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    seq: u64,
    ts_ns: u64,
    pid: i32,
    tgid: i32,
    dfd: i32,
    flags: u32,
    mode: u32,
    comm: &'a str,
    path: &'a str,
}

#[derive(Serialize)]
struct StatsRecord {
    #[serde(rename = "type")]
    kind: &'static str,
    cur_seq: u64,
    drops: u64,
    ring_size: usize,
}

/// One line describing `event`, without the trailing newline.
///
/// Text output escapes control characters so a record never spans lines.
pub fn event_line(event: &Event, format: OutputFormat) -> Result<String, serde_json::Error> {
    let comm = event.comm.to_string_lossy();
    let path = event.path.to_string_lossy();
    match format {
        OutputFormat::Json => serde_json::to_string(&EventRecord {
            kind: "openat",
            seq: event.seq,
            ts_ns: event.timestamp_ns,
            pid: event.pid,
            tgid: event.tgid,
            dfd: event.dir_fd,
            flags: event.flags as u32,
            mode: event.mode,
            comm: &comm,
            path: &path,
        }),
        OutputFormat::Text => Ok(format!(
            "[{}] pid={} tgid={} comm={} dfd={} flags={:#x} mode={:o} path={}",
            event.seq,
            event.pid,
            event.tgid,
            comm.escape_debug(),
            event.dir_fd,
            event.flags,
            event.mode,
            path.escape_debug()
        )),
    }
}

/// One line describing a reader's counters
pub fn stats_line(stats: &ReaderStats, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(&StatsRecord {
            kind: "stats",
            cur_seq: stats.cur_seq,
            drops: stats.dropped,
            ring_size: stats.capacity,
        }),
        OutputFormat::Text => Ok(format!(
            "[stats] drops={} cur_seq={} ring={}",
            stats.dropped, stats.cur_seq, stats.capacity
        )),
    }
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
