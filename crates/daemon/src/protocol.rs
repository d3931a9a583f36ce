// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between `oscope` and `oscoped`
//!
//! Each frame is a 4-byte big-endian length followed by a JSON body. A
//! connection is one reader: requests on it act on that reader's cursor.

use std::time::Duration;

use oscope_core::{
    CallSite, Event, OpenCall, RawFilter, RawStart, ReaderStats, RingStats, TraceError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Version exchanged in the Hello handshake
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timeout for a single request or response frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames larger than this are rejected before allocation
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Upper bound on one event's JSON encoding, with every text byte escaped
pub const MAX_EVENT_JSON_LEN: usize = 1024;

/// Most events one `Events` response may carry and still fit in a frame
pub const MAX_EVENTS_PER_FRAME: usize = MAX_FRAME_LEN / MAX_EVENT_JSON_LEN - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Hello {
        version: String,
    },

    /// Retrieve up to `max_count` matching events
    Read {
        max_count: usize,
        #[serde(default)]
        blocking: bool,
    },

    /// Wait for readiness. `None` waits indefinitely, `Some(0)` answers at once.
    Poll {
        #[serde(default)]
        wait_ms: Option<u64>,
    },

    Stats,

    SetFilter {
        filter: RawFilter,
    },

    SetStart {
        start: RawStart,
    },

    /// Submit one call as a producer; `path: None` records an unreadable path
    Ingest {
        site: CallSite,
        call: OpenCall,
        #[serde(default)]
        path: Option<String>,
    },

    /// Non-consuming copy of the retention window
    Snapshot,

    Status,

    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Hello {
        version: String,
    },

    Events {
        events: Vec<Event>,
    },

    Readiness {
        ready: bool,
    },

    Stats {
        stats: ReaderStats,
    },

    Ok,

    Ingested {
        seq: Option<u64>,
    },

    Snapshot {
        ring: RingStats,
        events: Vec<Event>,
    },

    Status {
        uptime_secs: u64,
        cur_seq: u64,
        capacity: usize,
        readers: usize,
        accepted: u64,
        discarded: u64,
    },

    ShuttingDown,

    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Error kinds carried in [`Response::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WouldBlock,
    Interrupted,
    InvalidArgument,
    SourceUnreadable,
    Closed,
    Internal,
}

impl ErrorKind {
    /// Rebuild the pipeline error on the client side, if there is one
    pub fn into_trace_error(self, message: &str) -> Option<TraceError> {
        match self {
            ErrorKind::WouldBlock => Some(TraceError::WouldBlock),
            ErrorKind::Interrupted => Some(TraceError::Interrupted),
            ErrorKind::InvalidArgument => Some(TraceError::invalid(message)),
            ErrorKind::SourceUnreadable => Some(TraceError::SourceUnreadable),
            ErrorKind::Closed => Some(TraceError::Closed),
            ErrorKind::Internal => None,
        }
    }
}

impl From<&TraceError> for ErrorKind {
    fn from(err: &TraceError) -> Self {
        match err {
            TraceError::WouldBlock => ErrorKind::WouldBlock,
            TraceError::Interrupted => ErrorKind::Interrupted,
            TraceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TraceError::SourceUnreadable => ErrorKind::SourceUnreadable,
            TraceError::Closed => ErrorKind::Closed,
        }
    }
}

impl From<TraceError> for Response {
    fn from(err: TraceError) -> Self {
        let message = match &err {
            TraceError::InvalidArgument(msg) => msg.clone(),
            other => other.to_string(),
        };
        Response::Error {
            kind: ErrorKind::from(&err),
            message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
}

/// Serialize a message to JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed frame
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(buf)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(data.len()));
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request, waiting indefinitely for it to start
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(request)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Read a response. `None` waits indefinitely.
pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Option<Duration>,
) -> Result<Response, ProtocolError> {
    let bytes = match timeout {
        Some(limit) => tokio::time::timeout(limit, read_message(reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??,
        None => read_message(reader).await?,
    };
    decode(&bytes)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
