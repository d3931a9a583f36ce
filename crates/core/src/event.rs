// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Open-call event record and its fixed wire layout
//!
//! An [`Event`] is plain data: fixed-size text fields, no heap pointers, `Copy`.
//! The ring stores events by value, so capturing one never allocates.
//!
//! ## Wire layout
//!
//! ```text
//! offset  size  field
//!      0     8  seq            (u64 LE)
//!      8     8  timestamp_ns   (u64 LE)
//!     16     4  pid            (i32 LE)
//!     20     4  tgid           (i32 LE)
//!     24    16  comm
//!     40    64  path
//!    104     4  dir_fd         (i32 LE)
//!    108     4  flags          (i32 LE)
//!    112     4  mode           (u32 LE)
//!    116     4  zero padding
//! ```

use crate::error::TraceError;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Capacity of the producer name field
pub const COMM_LEN: usize = 16;

/// Capacity of the target path field
pub const PATH_LEN: usize = 64;

/// Written into `path` when the caller's string could not be read
pub const BAD_PATH: &str = "<badptr>";

/// Bounded text stored inline.
///
/// Content is zero-filled past its end. A value that fills all `N` bytes has
/// no terminating NUL.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedText<const N: usize>([u8; N]);

impl<const N: usize> FixedText<N> {
    pub const fn zeroed() -> Self {
        Self([0; N])
    }

    /// Copy up to `N` bytes of `src`, truncating the rest
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut buf = [0; N];
        let len = src.len().min(N);
        buf[..len].copy_from_slice(&src[..len]);
        Self(buf)
    }

    pub fn from_raw(raw: [u8; N]) -> Self {
        Self(raw)
    }

    /// Content up to the first NUL, or all `N` bytes when full
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Whether `text` fits without truncation
    pub fn fits(text: &str) -> bool {
        text.len() <= N
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> From<&str> for FixedText<N> {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl<const N: usize> fmt::Display for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

// UTF-8 content travels as a string, anything else as raw bytes.
impl<const N: usize> Serialize for FixedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_bytes(self.as_bytes()),
        }
    }
}

struct FixedTextVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedTextVisitor<N> {
    type Value = FixedText<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string or byte array of at most {} bytes", N)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        self.visit_bytes(v.as_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        if v.len() > N {
            return Err(E::invalid_length(v.len(), &self));
        }
        Ok(FixedText::from_bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut buf = [0u8; N];
        let mut len = 0;
        while let Some(byte) = seq.next_element::<u8>()? {
            if len == N {
                return Err(de::Error::invalid_length(len + 1, &self));
            }
            buf[len] = byte;
            len += 1;
        }
        Ok(FixedText(buf))
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedText<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedTextVisitor::<N>)
    }
}

/// One intercepted open call.
///
/// `seq` is assigned by the ring when the event is pushed; whatever the
/// producer put there is overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    /// Monotonic clock, nanoseconds
    #[serde(rename = "ts_ns")]
    pub timestamp_ns: u64,
    /// Thread id of the call site
    pub pid: i32,
    /// Process id of the call site
    pub tgid: i32,
    #[serde(rename = "dfd")]
    pub dir_fd: i32,
    pub flags: i32,
    pub mode: u32,
    pub comm: FixedText<COMM_LEN>,
    pub path: FixedText<PATH_LEN>,
}

impl Event {
    pub const WIRE_SIZE: usize = 120;

    /// Encode into the fixed little-endian layout
    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            buf[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };
        put(&self.seq.to_le_bytes());
        put(&self.timestamp_ns.to_le_bytes());
        put(&self.pid.to_le_bytes());
        put(&self.tgid.to_le_bytes());
        put(self.comm.raw());
        put(self.path.raw());
        put(&self.dir_fd.to_le_bytes());
        put(&self.flags.to_le_bytes());
        put(&self.mode.to_le_bytes());
        buf
    }

    /// Decode one record produced by [`Event::to_wire`]
    pub fn from_wire(bytes: &[u8]) -> Result<Self, TraceError> {
        let bytes: &[u8; Self::WIRE_SIZE] = bytes.try_into().map_err(|_| {
            TraceError::invalid(format!(
                "event record must be {} bytes, got {}",
                Self::WIRE_SIZE,
                bytes.len()
            ))
        })?;
        let mut r = WireReader { buf: bytes, at: 0 };
        Ok(Event {
            seq: u64::from_le_bytes(r.take()),
            timestamp_ns: u64::from_le_bytes(r.take()),
            pid: i32::from_le_bytes(r.take()),
            tgid: i32::from_le_bytes(r.take()),
            comm: FixedText::from_raw(r.take()),
            path: FixedText::from_raw(r.take()),
            dir_fd: i32::from_le_bytes(r.take()),
            flags: i32::from_le_bytes(r.take()),
            mode: u32::from_le_bytes(r.take()),
        })
    }

    /// Whether the path could not be read from the caller
    pub fn path_unreadable(&self) -> bool {
        self.path.as_bytes() == BAD_PATH.as_bytes()
    }
}

struct WireReader<'a> {
    buf: &'a [u8; Event::WIRE_SIZE],
    at: usize,
}

impl WireReader<'_> {
    fn take<const K: usize>(&mut self) -> [u8; K] {
        let mut out = [0u8; K];
        out.copy_from_slice(&self.buf[self.at..self.at + K]);
        self.at += K;
        out
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
