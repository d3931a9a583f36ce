// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oscope-daemon: socket transport for the event pipeline
//!
//! The `oscoped` binary owns the ring. This library exposes the wire protocol
//! so that clients can speak it.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{ErrorKind, ProtocolError, Request, Response};
