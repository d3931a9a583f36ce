// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oscope daemon` - Start, stop and inspect oscoped

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::{
    self, daemon_stop, get_daemon_dir, read_daemon_pid, start_daemon_background, ClientError,
    DaemonClient,
};
use crate::commands::status::format_uptime;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start {
        /// Ring and ingest settings to use instead of the default oscope.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
    /// Show the daemon log
    Logs {
        /// Number of trailing lines to show
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,
    },
}

pub async fn daemon(args: DaemonArgs) -> Result<()> {
    match args.command {
        DaemonCommand::Start { config } => start(config).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Status => status().await,
        DaemonCommand::Logs { lines } => logs(lines),
    }
}

async fn start(config: Option<PathBuf>) -> Result<()> {
    if let Ok(client) = DaemonClient::connect() {
        if client.hello().await.is_ok() {
            println!("Daemon already running");
            return Ok(());
        }
    }

    let child = start_daemon_background(config.as_deref())?;
    DaemonClient::connect_with_retry(client::timeout_connect(), child).await?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    if daemon_stop().await? {
        println!("Daemon stopped");
    } else {
        println!("Daemon not running");
    }
    Ok(())
}

async fn status() -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // A socket left behind by a killed daemon refuses connections
    let version = match client.hello().await {
        Ok(version) => version,
        Err(_) => {
            println!("Daemon not running");
            return Ok(());
        }
    };
    let status = client.status().await?;

    println!("Status: running");
    println!("Version: {}", version);
    if let Some(pid) = read_daemon_pid()? {
        println!("PID: {}", pid);
    }
    println!("Uptime: {}", format_uptime(status.uptime_secs));
    println!("Readers: {}", status.readers);
    println!("Sequence: {}", status.cur_seq);
    println!("Capacity: {}", status.capacity);
    Ok(())
}

fn logs(lines: usize) -> Result<()> {
    let log_path = get_daemon_dir()?.join("daemon.log");
    let content = match std::fs::read_to_string(&log_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No daemon log at {}", log_path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for line in tail(&content, lines) {
        println!("{}", line);
    }
    Ok(())
}

fn tail(content: &str, lines: usize) -> impl Iterator<Item = &str> {
    let total = content.lines().count();
    content.lines().skip(total.saturating_sub(lines))
}
