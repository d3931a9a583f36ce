// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity event ring and sequencer
//!
//! One mutex guards the slots and `next_seq`. Every critical section is
//! bounded (at most [`FETCH_BATCH`] slot copies), allocation-free, and never
//! awaits. Waiters are woken through a `watch` channel carrying the latest
//! `next_seq`, published after the lock is released.
//!
//! ```text
//!                 oldest                      next_seq
//!                   |                            |
//!   seq:  ... evicted | s  s+1  ...          n-1 | (not yet assigned)
//!   slot:             s % capacity
//! ```

use crate::error::TraceError;
use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Default number of retained events
pub const DEFAULT_CAPACITY: usize = 1024;

/// Maximum slots copied per lock hold
pub(crate) const FETCH_BATCH: usize = 32;

/// Consistent view of the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingStats {
    /// Next sequence to be assigned
    pub cur_seq: u64,
    pub capacity: usize,
}

/// What a single [`RingBuffer::fetch`] observed under the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    /// First sequence copied: the requested one, clamped up to `oldest`
    pub start: u64,
    pub oldest: u64,
    pub next_seq: u64,
    pub copied: usize,
}

struct Slots {
    events: Box<[Event]>,
    next_seq: u64,
}

/// Circular event storage with a monotonically increasing sequence counter.
///
/// Share it as `Arc<RingBuffer>` between producers and readers. The ring does
/// not know how many readers exist or where they are.
pub struct RingBuffer {
    slots: Mutex<Slots>,
    capacity: usize,
    published: watch::Sender<u64>,
}

/// Oldest sequence still retained when `next_seq` is the next to be assigned
pub fn oldest_retained(next_seq: u64, capacity: usize) -> u64 {
    next_seq.saturating_sub(capacity as u64)
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, TraceError> {
        if capacity == 0 {
            return Err(TraceError::invalid("ring capacity must be at least 1"));
        }
        let (published, _) = watch::channel(0);
        Ok(Self {
            slots: Mutex::new(Slots {
                events: vec![Event::default(); capacity].into_boxed_slice(),
                next_seq: 0,
            }),
            capacity,
            published,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, seq: u64) -> usize {
        (seq % self.capacity as u64) as usize
    }

    /// Append an event, overwriting the oldest slot when full.
    ///
    /// Returns the assigned sequence. There is no backpressure.
    pub fn push(&self, event: Event) -> u64 {
        let seq = {
            let mut slots = self.lock();
            let seq = slots.next_seq;
            let idx = self.slot(seq);
            slots.events[idx] = Event { seq, ..event };
            slots.next_seq = seq.wrapping_add(1);
            seq
        };

        let next = seq.wrapping_add(1);
        // Concurrent pushers may publish out of order; keep the watched value monotonic.
        self.published.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });

        tracing::trace!(seq, "event pushed");
        seq
    }

    pub fn stats(&self) -> RingStats {
        let slots = self.lock();
        RingStats {
            cur_seq: slots.next_seq,
            capacity: self.capacity,
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.lock().next_seq
    }

    pub fn oldest(&self) -> u64 {
        oldest_retained(self.next_seq(), self.capacity)
    }

    /// Copy up to `out.len()` consecutive events starting at `from`.
    ///
    /// `from` below the retention window is moved up to `oldest`; the caller
    /// decides what that gap means.
    pub(crate) fn fetch(&self, from: u64, out: &mut [Event]) -> Window {
        let slots = self.lock();
        let next_seq = slots.next_seq;
        let oldest = oldest_retained(next_seq, self.capacity);
        let start = from.clamp(oldest, next_seq);
        let available = usize::try_from(next_seq - start).unwrap_or(usize::MAX);
        let copied = available.min(out.len());

        for (i, dst) in out[..copied].iter_mut().enumerate() {
            *dst = slots.events[self.slot(start + i as u64)];
        }

        Window {
            start,
            oldest,
            next_seq,
            copied,
        }
    }

    /// Copy of every retained event in ascending sequence order.
    ///
    /// Taken in batches; events pushed after the call started are not included,
    /// and events evicted while copying are skipped.
    pub fn snapshot(&self) -> Vec<Event> {
        let end = self.next_seq();
        let mut events = Vec::with_capacity(self.capacity);
        let mut batch = [Event::default(); FETCH_BATCH];
        let mut from = 0;

        while from < end {
            let window = self.fetch(from, &mut batch);
            if window.copied == 0 || window.start >= end {
                break;
            }
            let take = usize::try_from(end - window.start)
                .unwrap_or(usize::MAX)
                .min(window.copied);
            events.extend_from_slice(&batch[..take]);
            from = window.start + window.copied as u64;
        }

        events
    }

    /// Receiver that observes every published `next_seq`
    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.published.subscribe()
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("RingBuffer")
            .field("capacity", &stats.capacity)
            .field("next_seq", &stats.cur_seq)
            .finish()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
