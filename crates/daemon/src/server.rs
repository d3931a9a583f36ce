// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! Every connection is attached as one reader for its whole lifetime. Frames
//! are decoded by a separate task and queued, so a blocking `Read` or waiting
//! `Poll` can end early when the next request arrives or the client hangs up,
//! and when the daemon shuts down.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use oscope_core::{Reader, TraceError};
use oscope_daemon::protocol::{
    self, ProtocolError, Request, Response, DEFAULT_TIMEOUT, MAX_EVENTS_PER_FRAME,
    PROTOCOL_VERSION,
};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::lifecycle::Shared;

/// Decoded requests buffered ahead of the one being served
const INBOX_DEPTH: usize = 8;

/// Handle a client connection until it closes
pub async fn handle_connection(
    shared: Arc<Shared>,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (reader, mut writer) = stream.into_split();
    let mut inbox = Inbox::spawn(reader);
    let mut session = Session::attach(Arc::clone(&shared));

    loop {
        let request = tokio::select! {
            _ = shared.shutdown.cancelled() => {
                debug!("Closing connection for shutdown");
                return Ok(());
            }
            next = inbox.next() => match next {
                Some(Ok(req)) => req,
                None => {
                    debug!("Client disconnected");
                    return Ok(());
                }
                Some(Err(e)) => {
                    error!("Failed to read request: {}", e);
                    return Err(ServerError::Protocol(e));
                }
            },
        };

        debug!("Received request: {:?}", request);

        let response = session.handle(request, &mut inbox).await;
        if inbox.hung_up() {
            debug!("Client disconnected while waiting");
            return Ok(());
        }
        let shutting_down = matches!(response, Response::ShuttingDown);

        protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

        if shutting_down {
            shared.shutdown.cancel();
            return Ok(());
        }
    }
}

/// Requests decoded off the socket by a dedicated task.
///
/// `None` from the channel means the client hung up.
struct Inbox {
    rx: mpsc::Receiver<Result<Request, ProtocolError>>,
    /// Taken off the channel while a wait was in progress
    held: Option<Option<Result<Request, ProtocolError>>>,
    task: JoinHandle<()>,
}

impl Inbox {
    fn spawn(mut reader: OwnedReadHalf) -> Self {
        let (tx, rx) = mpsc::channel(INBOX_DEPTH);
        let task = tokio::spawn(async move {
            loop {
                let next = match protocol::read_request(&mut reader).await {
                    Err(ProtocolError::ConnectionClosed) => break,
                    next => next,
                };
                let failed = next.is_err();
                if tx.send(next).await.is_err() || failed {
                    break;
                }
            }
        });
        Self {
            rx,
            held: None,
            task,
        }
    }

    async fn next(&mut self) -> Option<Result<Request, ProtocolError>> {
        match self.held.take() {
            Some(held) => held,
            None => self.rx.recv().await,
        }
    }

    /// Resolves once something is waiting behind the current request.
    /// Cancel safe: nothing is lost if the future is dropped.
    async fn arrival(&mut self) {
        if self.held.is_none() {
            self.held = Some(self.rx.recv().await);
        }
    }

    fn hung_up(&self) -> bool {
        matches!(self.held, Some(None))
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The reader owned by one connection
struct Session {
    shared: Arc<Shared>,
    reader: Reader,
}

impl Session {
    fn attach(shared: Arc<Shared>) -> Self {
        let reader = Reader::attach(shared.ingest.ring());
        let readers = shared.readers.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(readers, "Reader attached");
        Self { shared, reader }
    }

    async fn handle(&mut self, request: Request, inbox: &mut Inbox) -> Response {
        match request {
            Request::Hello { version: _ } => Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            },

            Request::Read {
                max_count,
                blocking,
            } => {
                // The cursor moves before the reply is encoded; never consume
                // more than one frame can carry
                let max_count = max_count.min(MAX_EVENTS_PER_FRAME);
                let result = if blocking {
                    let cancel = self.shared.shutdown.child_token();
                    tokio::select! {
                        result = self.reader.read(max_count, true, &cancel) => result,
                        _ = inbox.arrival() => Err(TraceError::Interrupted),
                    }
                } else {
                    self.reader.try_read(max_count)
                };
                match result {
                    Ok(events) => Response::Events { events },
                    Err(e) => Response::from(e),
                }
            }

            Request::Poll { wait_ms } => self.poll(wait_ms, inbox).await,

            Request::Stats => Response::Stats {
                stats: self.reader.stats(),
            },

            Request::SetFilter { filter } => match self.reader.set_filter_raw(&filter) {
                Ok(()) => Response::Ok,
                Err(e) => Response::from(e),
            },

            Request::SetStart { start } => match self.reader.set_start_raw(start) {
                Ok(()) => Response::Ok,
                Err(e) => Response::from(e),
            },

            Request::Ingest { site, call, path } => Response::Ingested {
                seq: self.shared.ingest.record(&site, &call, &path),
            },

            Request::Snapshot => {
                let ring = self.shared.ingest.ring();
                let events = ring.snapshot();
                Response::Snapshot {
                    ring: ring.stats(),
                    events,
                }
            }

            Request::Status => {
                let ring = self.shared.ingest.ring().stats();
                let ingest = self.shared.ingest.stats();
                Response::Status {
                    uptime_secs: self.shared.start_time.elapsed().as_secs(),
                    cur_seq: ring.cur_seq,
                    capacity: ring.capacity,
                    readers: self.shared.readers.load(Ordering::Relaxed),
                    accepted: ingest.accepted,
                    discarded: ingest.discarded,
                }
            }

            Request::Shutdown => Response::ShuttingDown,
        }
    }

    async fn poll(&mut self, wait_ms: Option<u64>, inbox: &mut Inbox) -> Response {
        if self.reader.readiness() {
            return Response::Readiness { ready: true };
        }
        if wait_ms == Some(0) {
            return Response::Readiness { ready: false };
        }

        let cancel = self.shared.shutdown.child_token();
        let deadline = async {
            match wait_ms {
                Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = self.reader.wait_ready(&cancel) => match result {
                Ok(()) => Response::Readiness { ready: true },
                Err(e) => Response::from(e),
            },
            _ = deadline => Response::Readiness { ready: false },
            _ = inbox.arrival() => Response::from(TraceError::Interrupted),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let readers = self.shared.readers.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        debug!(readers, "Reader detached");
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
