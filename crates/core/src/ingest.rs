// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Producer-side capture of intercepted open calls
//!
//! [`Ingestor::record`] is the hot path. It builds the event on the stack,
//! copies the target path through a fixed scratch buffer, applies the ingest
//! filter and pushes. Rejected events never consume a sequence.

use crate::clock::{Clock, SystemClock};
use crate::error::TraceError;
use crate::event::{Event, FixedText, BAD_PATH, COMM_LEN, PATH_LEN};
use crate::filter::Filter;
use crate::ring::RingBuffer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of the thread that made the call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub pid: i32,
    pub tgid: i32,
    pub comm: FixedText<COMM_LEN>,
}

impl CallSite {
    pub fn new(pid: i32, tgid: i32, comm: &str) -> Self {
        Self {
            pid,
            tgid,
            comm: FixedText::from(comm),
        }
    }
}

/// Scalar arguments of an open call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCall {
    pub dir_fd: i32,
    pub flags: i32,
    pub mode: u32,
}

/// Where the target path lives. Implementations copy at most `PATH_LEN`
/// bytes into `scratch`, stopping at a NUL, and return the length copied.
pub trait PathSource {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError>;
}

impl PathSource for [u8] {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError> {
        let end = self.iter().position(|&b| b == 0).unwrap_or(self.len());
        let len = end.min(PATH_LEN);
        scratch[..len].copy_from_slice(&self[..len]);
        Ok(len)
    }
}

impl PathSource for str {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError> {
        self.as_bytes().read_path(scratch)
    }
}

/// `None` stands for a pointer that could not be dereferenced
impl<P: PathSource> PathSource for Option<P> {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError> {
        match self {
            Some(source) => source.read_path(scratch),
            None => Err(TraceError::SourceUnreadable),
        }
    }
}

impl<P: PathSource + ?Sized> PathSource for &P {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError> {
        (**self).read_path(scratch)
    }
}

impl PathSource for String {
    fn read_path(&self, scratch: &mut [u8; PATH_LEN]) -> Result<usize, TraceError> {
        self.as_str().read_path(scratch)
    }
}

/// Counters exposed by [`Ingestor::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub discarded: u64,
}

/// Turns intercepted calls into ring events
pub struct Ingestor<C: Clock = SystemClock> {
    ring: Arc<RingBuffer>,
    filter: Filter,
    clock: C,
    accepted: AtomicU64,
    discarded: AtomicU64,
}

impl<C: Clock> Ingestor<C> {
    pub fn new(ring: Arc<RingBuffer>, filter: Filter, clock: C) -> Self {
        Self {
            ring,
            filter,
            clock,
            accepted: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Capture one call. Returns the assigned sequence, or `None` when the
    /// ingest filter rejected it.
    pub fn record<P: PathSource + ?Sized>(
        &self,
        site: &CallSite,
        call: &OpenCall,
        path: &P,
    ) -> Option<u64> {
        let mut event = Event {
            timestamp_ns: self.clock.monotonic_ns(),
            pid: site.pid,
            tgid: site.tgid,
            comm: site.comm,
            dir_fd: call.dir_fd,
            flags: call.flags,
            mode: call.mode,
            ..Event::default()
        };

        let mut scratch = [0u8; PATH_LEN];
        event.path = match path.read_path(&mut scratch) {
            Ok(len) => FixedText::from_bytes(&scratch[..len.min(PATH_LEN)]),
            Err(_) => FixedText::from(BAD_PATH),
        };

        if !self.filter.matches(&event) {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let seq = self.ring.push(event);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Some(seq)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
