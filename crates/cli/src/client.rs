// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use oscope_core::{
    CallSite, Event, OpenCall, RawFilter, RawStart, ReaderStats, RingStats, TraceError,
};
use oscope_daemon::protocol::{self, ProtocolError};
use oscope_daemon::{Request, Response};
use serde::Serialize;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests (hello, status, ingest, snapshot, shutdown)
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("OSCOPE_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("OSCOPE_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("OSCOPE_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("OSCOPE_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The daemon answered with a pipeline error
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    fn from_response(response: Response) -> Self {
        match response {
            Response::Error { kind, message } => match kind.into_trace_error(&message) {
                Some(err) => ClientError::Trace(err),
                None => ClientError::Rejected(message),
            },
            _ => ClientError::UnexpectedResponse,
        }
    }
}

/// Daemon-wide counters reported by `Status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub cur_seq: u64,
    pub capacity: usize,
    pub readers: usize,
    pub accepted: u64,
    pub discarded: u64,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to daemon, auto-starting if not running
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        // Restart a daemon left over from a different build
        if let Ok(daemon_dir) = get_daemon_dir() {
            let version_path = daemon_dir.join("daemon.version");
            if let Ok(daemon_version) = std::fs::read_to_string(&version_path) {
                if daemon_version.trim() != env!("CARGO_PKG_VERSION") {
                    debug!(daemon = daemon_version.trim(), "Daemon version mismatch, restarting");
                    let _ = daemon_stop().await;
                }
            }
        }

        match Self::connect() {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background(None)?;
                Self::connect_with_retry(timeout_connect(), child).await
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = get_socket_path()?;

        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self { socket_path })
    }

    /// Wait for a freshly spawned daemon to bind its socket
    pub async fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // An early exit means startup failed
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => {
                    tokio::time::sleep(poll_interval()).await;
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        // Timeout - check log for startup errors
        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Open a connection that stays attached as one reader
    pub async fn open(&self) -> Result<Connection, ClientError> {
        Connection::open(&self.socket_path).await
    }

    /// Send a request on a fresh connection and receive its response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut conn = self.open().await?;
        conn.call(&request, Some(timeout_ipc())).await
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                cur_seq,
                capacity,
                readers,
                accepted,
                discarded,
            } => Ok(DaemonStatus {
                uptime_secs,
                cur_seq,
                capacity,
                readers,
                accepted,
                discarded,
            }),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Copy of everything the ring currently retains
    pub async fn snapshot(&self) -> Result<(RingStats, Vec<Event>), ClientError> {
        match self.send(Request::Snapshot).await? {
            Response::Snapshot { ring, events } => Ok((ring, events)),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(ClientError::from_response(other)),
        }
    }
}

/// One open socket, attached on the daemon side as a reader
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    pub async fn open(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self { stream })
    }

    /// Send one request and wait for its response.
    ///
    /// `read_timeout: None` waits as long as the daemon takes.
    pub async fn call(
        &mut self,
        request: &Request,
        read_timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        protocol::write_request(&mut self.stream, request, timeout_ipc()).await?;
        Ok(protocol::read_response(&mut self.stream, read_timeout).await?)
    }

    async fn expect_ok(&mut self, request: Request) -> Result<(), ClientError> {
        match self.call(&request, Some(timeout_ipc())).await? {
            Response::Ok => Ok(()),
            other => Err(ClientError::from_response(other)),
        }
    }

    pub async fn set_filter(&mut self, filter: RawFilter) -> Result<(), ClientError> {
        self.expect_ok(Request::SetFilter { filter }).await
    }

    pub async fn set_start(&mut self, start: RawStart) -> Result<(), ClientError> {
        self.expect_ok(Request::SetStart { start }).await
    }

    pub async fn stats(&mut self) -> Result<ReaderStats, ClientError> {
        match self.call(&Request::Stats, Some(timeout_ipc())).await? {
            Response::Stats { stats } => Ok(stats),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Wait up to `wait` for a matching event; returns readiness
    pub async fn poll(&mut self, wait: Duration) -> Result<bool, ClientError> {
        let request = Request::Poll {
            wait_ms: Some(wait.as_millis() as u64),
        };
        match self.call(&request, Some(wait + timeout_ipc())).await? {
            Response::Readiness { ready } => Ok(ready),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Nonblocking read; nothing pending is `ClientError::Trace(WouldBlock)`
    pub async fn read(&mut self, max_count: usize) -> Result<Vec<Event>, ClientError> {
        let request = Request::Read {
            max_count,
            blocking: false,
        };
        match self.call(&request, Some(timeout_ipc())).await? {
            Response::Events { events } => Ok(events),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Submit one call as a producer; `None` if the ingest filter discarded it
    pub async fn ingest(
        &mut self,
        site: CallSite,
        call: OpenCall,
        path: Option<String>,
    ) -> Result<Option<u64>, ClientError> {
        let request = Request::Ingest { site, call, path };
        match self.call(&request, Some(timeout_ipc())).await? {
            Response::Ingested { seq } => Ok(seq),
            other => Err(ClientError::from_response(other)),
        }
    }
}

/// Start the daemon in the background, returning the child process handle
pub fn start_daemon_background(
    config: Option<&Path>,
) -> Result<std::process::Child, ClientError> {
    let daemon_path = find_daemon_binary();
    debug!(binary = %daemon_path.display(), "Starting daemon");

    let mut command = Command::new(&daemon_path);
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            // Clean up any stale files
            if let Ok(daemon_dir) = get_daemon_dir() {
                cleanup_stale_pid(&daemon_dir);
            }
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    // Try graceful shutdown (timeout handled by send())
    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid()? {
        if shutdown_result.is_ok() {
            // Graceful shutdown succeeded, wait for process to exit
            wait_for_exit(pid, timeout_exit()).await;
        }

        // Force kill if still running
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    // A killed daemon leaves its socket behind
    let socket_path = get_socket_path()?;
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    cleanup_stale_pid(&get_daemon_dir()?);

    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the oscoped binary
fn find_daemon_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("OSCOPE_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // First check if we're running from cargo (development)
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let dev_path = PathBuf::from(manifest_dir)
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.join("target/debug/oscoped"));
        if let Some(path) = dev_path {
            if path.exists() {
                return path;
            }
        }
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("oscoped");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("oscoped")
}

/// Get the daemon socket path
///
/// Uses a short path under /tmp to avoid SUN_LEN limit (104 bytes on macOS).
pub fn get_socket_path() -> Result<PathBuf, ClientError> {
    Ok(socket_dir()?.join("oscoped.sock"))
}

/// Get the socket directory for oscope
///
/// Can be overridden with OSCOPE_SOCKET_DIR for testing.
fn socket_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("OSCOPE_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/oscope"))
}

/// Get the daemon state directory (where logs, pid, version files live)
pub fn get_daemon_dir() -> Result<PathBuf, ClientError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("oscope"));
    }

    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/oscope"))
}

/// Clean up orphaned PID file during shutdown.
///
/// Called by daemon_stop when the daemon is not running or after stopping it.
fn cleanup_stale_pid(daemon_dir: &Path) {
    let pid_path = daemon_dir.join("daemon.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = get_daemon_dir()?.join("daemon.pid");

    if !pid_path.exists() {
        return Ok(None);
    }

    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // kill -0 checks existence without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Startup marker prefix that daemon writes to log before anything else.
/// Full format: "--- oscoped: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- oscoped: starting (pid: ";

/// Read daemon log from startup marker, looking for errors.
/// Returns the error message if found, None otherwise.
pub fn read_startup_error() -> Option<String> {
    let log_path = get_daemon_dir().ok()?.join("daemon.log");
    let content = std::fs::read_to_string(&log_path).ok()?;
    startup_error_in(&content)
}

/// Errors logged since the last startup marker in `log`
fn startup_error_in(log: &str) -> Option<String> {
    let start_pos = log.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &log[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Format: "timestamp LEVEL target: message"
    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}

/// Wrap an error with startup log info if available.
/// If the daemon log contains errors, return DaemonStartFailed with that info.
/// Otherwise, return the original error.
fn wrap_with_startup_error(err: ClientError) -> ClientError {
    // Don't double-wrap
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error() {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
