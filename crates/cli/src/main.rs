// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oscope - file-open event stream CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, dump, emit, ring, status};

#[derive(Parser)]
#[command(
    name = "oscope",
    version,
    about = "oscope - Follow file-open events buffered by oscoped"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream events as one reader until interrupted
    Dump(dump::DumpArgs),
    /// Submit a synthetic open call
    Emit(emit::EmitArgs),
    /// Show ring and ingest counters
    Status(status::StatusArgs),
    /// Print the retained events without consuming them
    Ring(ring::RingArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    setup_logging();

    if let Err(e) = run(Cli::parse()).await {
        eprint!("{}", error::render(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Dump(args) => dump::handle(args).await,
        Commands::Emit(args) => emit::handle(args).await,
        Commands::Status(args) => status::handle(args).await,
        Commands::Ring(args) => ring::handle(args).await,
        Commands::Daemon(args) => daemon::daemon(args).await,
    }
}

/// Diagnostics go to stderr so stdout stays machine-readable
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("OSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
