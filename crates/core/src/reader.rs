// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reader handles and event retrieval
//!
//! A [`Reader`] owns one cursor over a shared ring. Retrieval walks the ring in
//! bounded batches, reconciling against eviction on every batch, and advances
//! the cursor past every visited sequence whether or not it matched the
//! reader's filter.
//!
//! Blocking calls suspend on the ring's `watch` channel outside the ring lock
//! and return [`TraceError::Interrupted`] when the caller's
//! [`CancellationToken`] fires. Suspension only happens between walks, so a
//! cancelled read never leaves the cursor partially advanced.

use crate::cursor::{Cursor, StartPosition};
use crate::error::TraceError;
use crate::event::Event;
use crate::ring::{RingBuffer, FETCH_BATCH};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One attached consumer. Dropping it detaches.
#[derive(Debug)]
pub struct Reader {
    pub(crate) ring: Arc<RingBuffer>,
    pub(crate) cursor: Cursor,
    published: watch::Receiver<u64>,
}

/// Outcome of one pass over the unread part of the ring
struct Walk {
    events: Vec<Event>,
    consumed: u64,
    /// Ring head seen by the last batch
    observed: u64,
}

impl Reader {
    /// Attach with a match-all filter, starting at [`StartPosition::Now`]
    pub fn attach(ring: &Arc<RingBuffer>) -> Self {
        Self::attach_at(ring, StartPosition::Now)
    }

    pub fn attach_at(ring: &Arc<RingBuffer>, start: StartPosition) -> Self {
        // Subscribe before sampling the head so no push is missed in between.
        let published = ring.subscribe();
        let cursor = Cursor::new(start, ring.stats());
        tracing::debug!(next_seq = cursor.next_seq(), %start, "reader attached");
        Self {
            ring: Arc::clone(ring),
            cursor,
            published,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    /// Retrieve up to `max_count` matching events in ascending `seq` order.
    ///
    /// Nonblocking: `WouldBlock` when no sequence was available at all, an
    /// empty vec when sequences were consumed but none matched. Blocking:
    /// suspends until at least one matching event arrives or `cancel` fires.
    pub async fn read(
        &mut self,
        max_count: usize,
        blocking: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, TraceError> {
        if max_count == 0 {
            return Err(TraceError::invalid("max_count must be at least 1"));
        }

        loop {
            let walk = self.walk(max_count);
            if !walk.events.is_empty() {
                return Ok(walk.events);
            }
            if !blocking {
                return if walk.consumed > 0 {
                    Ok(walk.events)
                } else {
                    Err(TraceError::WouldBlock)
                };
            }
            self.wait_past(walk.observed, cancel).await?;
        }
    }

    /// Nonblocking [`read`](Self::read)
    pub fn try_read(&mut self, max_count: usize) -> Result<Vec<Event>, TraceError> {
        if max_count == 0 {
            return Err(TraceError::invalid("max_count must be at least 1"));
        }
        let walk = self.walk(max_count);
        if walk.events.is_empty() && walk.consumed == 0 {
            return Err(TraceError::WouldBlock);
        }
        Ok(walk.events)
    }

    /// Whether a read would deliver at least one event. Never moves the cursor.
    pub fn readiness(&self) -> bool {
        self.probe().0
    }

    /// Suspend until [`readiness`](Self::readiness) is true
    pub async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<(), TraceError> {
        loop {
            let (ready, observed) = self.probe();
            if ready {
                return Ok(());
            }
            self.wait_past(observed, cancel).await?;
        }
    }

    fn walk(&mut self, max_count: usize) -> Walk {
        let mut events = Vec::with_capacity(max_count.min(FETCH_BATCH));
        let mut batch = [Event::default(); FETCH_BATCH];
        let mut consumed = 0;

        loop {
            let window = self.ring.fetch(self.cursor.next_seq(), &mut batch);
            let lost = self.cursor.reconcile(window.oldest);
            if lost > 0 {
                tracing::debug!(lost, next_seq = self.cursor.next_seq(), "reader fell behind");
            }

            for event in &batch[..window.copied] {
                self.cursor.consume(event.seq);
                consumed += 1;
                if self.cursor.filter().matches(event) {
                    events.push(*event);
                    if events.len() == max_count {
                        return Walk {
                            events,
                            consumed,
                            observed: window.next_seq,
                        };
                    }
                }
            }

            if self.cursor.next_seq() >= window.next_seq {
                return Walk {
                    events,
                    consumed,
                    observed: window.next_seq,
                };
            }
        }
    }

    /// Scan `[reconciled next_seq, head)` for a match without consuming
    fn probe(&self) -> (bool, u64) {
        let mut batch = [Event::default(); FETCH_BATCH];
        let mut from = self.cursor.next_seq();

        loop {
            let window = self.ring.fetch(from, &mut batch);
            if window.copied == 0 {
                return (false, window.next_seq);
            }
            if self.cursor.filter().is_match_all()
                || batch[..window.copied]
                    .iter()
                    .any(|event| self.cursor.filter().matches(event))
            {
                return (true, window.next_seq);
            }
            from = window.start + window.copied as u64;
        }
    }

    /// Suspend until the ring head passes `observed`
    async fn wait_past(
        &mut self,
        observed: u64,
        cancel: &CancellationToken,
    ) -> Result<(), TraceError> {
        let published = &mut self.published;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TraceError::Interrupted),
            result = head_passes(published, observed) => result,
        }
    }
}

async fn head_passes(rx: &mut watch::Receiver<u64>, observed: u64) -> Result<(), TraceError> {
    loop {
        if *rx.borrow_and_update() > observed {
            return Ok(());
        }
        rx.changed().await.map_err(|_| TraceError::Closed)?;
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
