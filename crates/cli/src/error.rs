// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! This module provides enhanced error types that include:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)

use std::fmt;

use oscope_core::TraceError;

use crate::client::ClientError;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CliError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add context about why this error might have happened.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Add a suggestion for how to fix this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}

/// Common error builders for typical failure scenarios.
impl CliError {
    /// Error for commands that need an already running daemon.
    pub fn daemon_not_running() -> Self {
        CliError::new("Daemon not running")
            .with_context("No socket found for oscoped")
            .with_suggestion("Start it with: oscope daemon start")
    }

    /// Error for when the daemon exits or never binds during startup.
    pub fn daemon_start_failed(reason: &str) -> Self {
        CliError::new("Failed to start daemon")
            .with_context(reason.to_string())
            .with_suggestion("Check the daemon log: oscope daemon logs")
            .with_suggestion("Check ring settings in oscope.toml under the state directory")
    }

    /// Error for a filter or start position the daemon refused.
    pub fn invalid_argument(detail: &str) -> Self {
        CliError::new(format!("Invalid argument: {}", detail))
            .with_suggestion("--from accepts now, oldest or seq:<N>")
            .with_suggestion("--comm must fit in 16 bytes")
    }
}

impl From<&ClientError> for CliError {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::DaemonNotRunning => CliError::daemon_not_running(),
            ClientError::DaemonStartFailed(reason) => CliError::daemon_start_failed(reason),
            ClientError::DaemonStartTimeout => {
                CliError::daemon_start_failed("timed out waiting for the socket")
            }
            ClientError::Trace(TraceError::InvalidArgument(detail)) => {
                CliError::invalid_argument(detail)
            }
            other => CliError::new(other.to_string()),
        }
    }
}

/// Render any command failure for stderr
pub fn render(err: &anyhow::Error) -> String {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.to_string();
    }
    if let Some(client) = err.downcast_ref::<ClientError>() {
        return CliError::from(client).to_string();
    }
    if let Some(TraceError::InvalidArgument(detail)) = err.downcast_ref::<TraceError>() {
        return CliError::invalid_argument(detail).to_string();
    }
    format!("error: {:#}\n", err)
}
