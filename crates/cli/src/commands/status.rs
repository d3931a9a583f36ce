// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oscope status` - Ring and reader counters of the running daemon

use std::fmt;

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient, DaemonStatus};
use crate::error::CliError;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Reports on a running daemon; never starts one
pub async fn handle(args: StatusArgs) -> Result<()> {
    let client = DaemonClient::connect().map_err(|e| match e {
        ClientError::DaemonNotRunning => anyhow::Error::new(CliError::daemon_not_running()),
        other => other.into(),
    })?;
    let status = client.status().await?;
    output::print(&status, args.format);
    Ok(())
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Uptime: {}", format_uptime(self.uptime_secs))?;
        writeln!(f, "Sequence: {}", self.cur_seq)?;
        writeln!(f, "Capacity: {}", self.capacity)?;
        writeln!(f, "Readers: {}", self.readers)?;
        writeln!(f, "Accepted: {}", self.accepted)?;
        write!(f, "Discarded: {}", self.discarded)
    }
}

/// `1h 2m 3s`, dropping leading zero units
pub fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}
