// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-reader position and loss accounting

use crate::error::TraceError;
use crate::filter::Filter;
use crate::ring::{oldest_retained, RingStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a cursor begins, applied on attach and on every `set_start`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartPosition {
    /// Only events pushed from now on
    #[default]
    Now,
    /// Everything still retained
    Oldest,
    /// A specific sequence, clamped into the retention window
    At(u64),
}

impl StartPosition {
    /// Sequence this directive points at for the given ring state
    pub fn resolve(self, stats: RingStats) -> u64 {
        let oldest = oldest_retained(stats.cur_seq, stats.capacity);
        match self {
            StartPosition::Now => stats.cur_seq,
            StartPosition::Oldest => oldest,
            StartPosition::At(seq) => seq.clamp(oldest, stats.cur_seq),
        }
    }

    pub fn from_raw(raw: RawStart) -> Result<Self, TraceError> {
        match raw.mode {
            RawStart::NOW => Ok(StartPosition::Now),
            RawStart::OLDEST => Ok(StartPosition::Oldest),
            RawStart::SEQ => Ok(StartPosition::At(raw.seq)),
            mode => Err(TraceError::invalid(format!("unknown start mode {}", mode))),
        }
    }

    pub fn to_raw(self) -> RawStart {
        match self {
            StartPosition::Now => RawStart {
                mode: RawStart::NOW,
                seq: 0,
            },
            StartPosition::Oldest => RawStart {
                mode: RawStart::OLDEST,
                seq: 0,
            },
            StartPosition::At(seq) => RawStart {
                mode: RawStart::SEQ,
                seq,
            },
        }
    }
}

/// Parses `now`, `oldest` or `seq:<N>`
impl FromStr for StartPosition {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "now" => Ok(StartPosition::Now),
            "oldest" => Ok(StartPosition::Oldest),
            other => other
                .strip_prefix("seq:")
                .and_then(|n| n.parse().ok())
                .map(StartPosition::At)
                .ok_or_else(|| {
                    TraceError::invalid(format!(
                        "bad start position {:?} (now|oldest|seq:<N>)",
                        other
                    ))
                }),
        }
    }
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPosition::Now => write!(f, "now"),
            StartPosition::Oldest => write!(f, "oldest"),
            StartPosition::At(seq) => write!(f, "seq:{}", seq),
        }
    }
}

/// Wire form of [`StartPosition`]: mode `0=now, 1=oldest, 2=seq`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStart {
    pub mode: u32,
    #[serde(default)]
    pub seq: u64,
}

impl RawStart {
    pub const NOW: u32 = 0;
    pub const OLDEST: u32 = 1;
    pub const SEQ: u32 = 2;
}

/// A reader's private bookmark.
///
/// A cursor started at [`StartPosition::Oldest`] trails the retention window
/// until it first consumes a sequence: evictions before that point are not
/// counted as drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    next_seq: u64,
    dropped: u64,
    filter: Filter,
    trailing: bool,
}

impl Cursor {
    pub fn new(start: StartPosition, stats: RingStats) -> Self {
        Self {
            next_seq: start.resolve(stats),
            dropped: 0,
            filter: Filter::all(),
            trailing: start == StartPosition::Oldest,
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Catch up with eviction. Returns how many sequences were newly lost.
    ///
    /// Calling it again with the same `oldest` is a no-op.
    pub fn reconcile(&mut self, oldest: u64) -> u64 {
        if self.next_seq >= oldest {
            return 0;
        }
        let lost = oldest - self.next_seq;
        self.next_seq = oldest;
        if self.trailing {
            return 0;
        }
        self.dropped += lost;
        lost
    }

    /// Mark `seq` as visited, whether or not it matched the filter
    pub(crate) fn consume(&mut self, seq: u64) {
        self.next_seq = seq + 1;
        self.trailing = false;
    }

    pub(crate) fn restart(&mut self, start: StartPosition, stats: RingStats) {
        let filter = self.filter;
        *self = Cursor::new(start, stats);
        self.filter = filter;
    }

    pub(crate) fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
