// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band reader control
//!
//! Every operation validates its whole argument before touching the cursor,
//! so a rejected request leaves the reader exactly as it was.

use crate::cursor::{RawStart, StartPosition};
use crate::error::TraceError;
use crate::filter::{Filter, RawFilter};
use crate::reader::Reader;
use serde::{Deserialize, Serialize};

/// Per-reader view returned by [`Reader::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStats {
    /// Next sequence the ring will assign
    pub cur_seq: u64,
    /// Sequences this reader lost to eviction
    pub dropped: u64,
    pub capacity: usize,
}

impl Reader {
    pub fn stats(&self) -> ReaderStats {
        let ring = self.ring.stats();
        ReaderStats {
            cur_seq: ring.cur_seq,
            dropped: self.cursor.dropped(),
            capacity: ring.capacity,
        }
    }

    /// Replace the delivery filter. Applies from the next read; `dropped` is kept.
    pub fn set_filter(&mut self, filter: Filter) {
        tracing::debug!(?filter, "reader filter replaced");
        self.cursor.set_filter(filter);
    }

    /// Reposition the cursor and zero its drop counter
    pub fn set_start(&mut self, start: StartPosition) {
        self.cursor.restart(start, self.ring.stats());
        tracing::debug!(%start, next_seq = self.cursor.next_seq(), "reader repositioned");
    }

    pub fn set_filter_raw(&mut self, raw: &RawFilter) -> Result<(), TraceError> {
        let filter = Filter::from_raw(raw)?;
        self.set_filter(filter);
        Ok(())
    }

    pub fn set_start_raw(&mut self, raw: RawStart) -> Result<(), TraceError> {
        let start = StartPosition::from_raw(raw)?;
        self.set_start(start);
        Ok(())
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
