// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oscope-core: event pipeline for open-call tracing
//!
//! This crate provides:
//! - A fixed-capacity ring with monotonic sequencing ([`RingBuffer`])
//! - Independent readers with their own cursor, filter and drop counter
//! - Blocking, nonblocking and readiness-based retrieval
//! - The producer-side ingestion path with a global ingest filter

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod ring;

// Consumer side (order matters for dependencies)
pub mod cursor;
pub mod reader;
pub mod control;

pub mod ingest;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, TraceConfig};
pub use control::ReaderStats;
pub use cursor::{Cursor, RawStart, StartPosition};
pub use error::TraceError;
pub use event::{Event, FixedText, BAD_PATH, COMM_LEN, PATH_LEN};
pub use filter::{Filter, RawFilter};
pub use ingest::{CallSite, IngestStats, Ingestor, OpenCall, PathSource};
pub use reader::Reader;
pub use ring::{oldest_retained, RingBuffer, RingStats, DEFAULT_CAPACITY};
pub use tokio_util::sync::CancellationToken;
