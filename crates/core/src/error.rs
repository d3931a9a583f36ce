// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced by the event pipeline

use thiserror::Error;

/// Errors returned by ring, reader and control operations.
///
/// Overwriting the oldest slot of a full ring is not an error; it only shows
/// up in each reader's `dropped` counter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// Nonblocking call found nothing to deliver
    #[error("no events available")]
    WouldBlock,

    /// Blocking call was cancelled; cursor state is unaffected
    #[error("interrupted while waiting for events")]
    Interrupted,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Producer-side argument extraction failed
    #[error("source string could not be read")]
    SourceUnreadable,

    /// The ring publisher went away while a reader was suspended
    #[error("ring buffer closed")]
    Closed,
}

impl TraceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        TraceError::InvalidArgument(msg.into())
    }

    /// Stable short name for the error kind, used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            TraceError::WouldBlock => "would_block",
            TraceError::Interrupted => "interrupted",
            TraceError::InvalidArgument(_) => "invalid_argument",
            TraceError::SourceUnreadable => "source_unreadable",
            TraceError::Closed => "closed",
        }
    }
}
