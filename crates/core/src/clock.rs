// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event timestamp source

use nix::time::{clock_gettime, ClockId};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stamps events at ingest
pub trait Clock: Clone + Send + Sync {
    /// Nanoseconds on the monotonic clock
    fn monotonic_ns(&self) -> u64;
}

/// `CLOCK_MONOTONIC`, as the kernel stamps its own trace records
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_ns(&self) -> u64 {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => (ts.tv_sec() as u64)
                .saturating_mul(1_000_000_000)
                .saturating_add(ts.tv_nsec() as u64),
            Err(_) => 0,
        }
    }
}

/// Manually driven clock; clones share one reading.
///
/// Starts at zero and only moves with [`FakeClock::advance`].
#[derive(Clone, Default)]
pub struct FakeClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += duration;
    }
}

impl Clock for FakeClock {
    fn monotonic_ns(&self) -> u64 {
        let elapsed = *self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
