// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oscope dump` - Follow the event stream as one reader
//!
//! Each round waits for readiness, drains with nonblocking reads until the
//! daemon reports nothing pending, then decides whether to print a stats
//! line. Ctrl-C ends the loop after a final stats line.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use oscope_core::{Filter, RawFilter, StartPosition, TraceError};
use tracing::debug;

use crate::client::{ClientError, Connection, DaemonClient};
use crate::output::{self, OutputFormat};

/// Longest single readiness wait, so Ctrl-C is noticed promptly
const POLL_SLICE: Duration = Duration::from_millis(200);

const PERF_PERIOD: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct DumpArgs {
    /// Only events from this thread id
    #[arg(long)]
    pub pid: Option<i32>,

    /// Only events from this process id
    #[arg(long)]
    pub tgid: Option<i32>,

    /// Only events whose command name is exactly this
    #[arg(long)]
    pub comm: Option<String>,

    /// Where to start: now, oldest or seq:<N>
    #[arg(long, default_value = "now")]
    pub from: StartPosition,

    /// Print a stats line every N drains (0 = only when drops change)
    #[arg(long, default_value = "0")]
    pub stats_every: u64,

    /// Maximum events per read
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch: u64,

    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Print a throughput summary to stderr once per second
    #[arg(long)]
    pub perf: bool,

    /// Suppress event lines, keep stats lines
    #[arg(long)]
    pub quiet: bool,
}

impl DumpArgs {
    fn filter(&self) -> RawFilter {
        RawFilter {
            pid: self.pid.unwrap_or(RawFilter::ANY),
            tgid: self.tgid.unwrap_or(RawFilter::ANY),
            comm: self.comm.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(args: DumpArgs) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    // Reject a bad filter before touching the daemon
    let filter = args.filter();
    Filter::from_raw(&filter)?;

    let client = DaemonClient::connect_or_start().await?;
    let mut conn = client.open().await?;
    conn.set_filter(filter).await?;
    conn.set_start(args.from.to_raw()).await?;
    debug!(from = %args.from, "Reader configured");

    let mut out = std::io::BufWriter::new(std::io::stdout());
    let mut counters = Counters::default();
    let mut perf = PerfReport::new(Instant::now());
    let mut last_drops = 0;

    while !interrupted.load(Ordering::SeqCst) {
        let ready = conn.poll(POLL_SLICE).await?;
        if ready {
            counters.wakes += 1;
            drain(&mut conn, &args, &mut out, &mut counters).await?;
            counters.drains += 1;

            let stats = conn.stats().await?;
            if stats_due(counters.drains, args.stats_every, stats.dropped, last_drops) {
                writeln!(out, "{}", output::stats_line(&stats, args.format)?)?;
            }
            last_drops = stats.dropped;
            out.flush()?;
        }

        if args.perf {
            if let Some(line) = perf.tick(Instant::now(), &counters) {
                eprintln!("{}", line);
            }
        }
    }

    let stats = conn.stats().await?;
    writeln!(out, "{}", output::stats_line(&stats, args.format)?)?;
    out.flush()?;
    Ok(())
}

/// Read until the daemon has nothing more for this reader
async fn drain(
    conn: &mut Connection,
    args: &DumpArgs,
    out: &mut impl Write,
    counters: &mut Counters,
) -> Result<()> {
    loop {
        counters.reads += 1;
        match conn.read(args.batch as usize).await {
            // Only filter mismatches were skipped
            Ok(events) if events.is_empty() => return Ok(()),
            Ok(events) => {
                counters.events += events.len() as u64;
                if !args.quiet {
                    for event in &events {
                        writeln!(out, "{}", output::event_line(event, args.format)?)?;
                    }
                }
            }
            Err(ClientError::Trace(TraceError::WouldBlock)) => {
                counters.would_block += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Whether a drain round ends with a stats line
fn stats_due(drains: u64, every: u64, dropped: u64, last_drops: u64) -> bool {
    (every > 0 && drains % every == 0) || dropped != last_drops
}

/// Running totals for the consume loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    wakes: u64,
    drains: u64,
    reads: u64,
    events: u64,
    would_block: u64,
}

/// Once-per-period rate summary over [`Counters`]
struct PerfReport {
    since: Instant,
    last: Counters,
}

impl PerfReport {
    fn new(now: Instant) -> Self {
        Self {
            since: now,
            last: Counters::default(),
        }
    }

    fn tick(&mut self, now: Instant, current: &Counters) -> Option<String> {
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < PERF_PERIOD {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let rate = |now: u64, then: u64| (now - then) as f64 / secs;
        let reads = current.reads - self.last.reads;
        let per_read = |n: u64| {
            if reads == 0 {
                0.0
            } else {
                n as f64 / reads as f64
            }
        };

        let line = format!(
            "[perf] wake/s={:.1} drain/s={:.1} read/s={:.1} events/s={:.1} events/read={:.2} wouldblock/read={:.2}",
            rate(current.wakes, self.last.wakes),
            rate(current.drains, self.last.drains),
            rate(current.reads, self.last.reads),
            rate(current.events, self.last.events),
            per_read(current.events - self.last.events),
            per_read(current.would_block - self.last.would_block),
        );
        self.since = now;
        self.last = *current;
        Some(line)
    }
}

#[cfg(test)]
#[path = "dump_tests.rs"]
mod tests;
