// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oscope ring` - Print the retention window without consuming it

use anyhow::Result;
use clap::Args;
use oscope_core::{oldest_retained, Event, RingStats};

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RingArgs {
    /// Only the newest N retained events
    #[arg(long)]
    pub tail: Option<usize>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn handle(args: RingArgs) -> Result<()> {
    let client = DaemonClient::connect_or_start().await?;
    let (ring, events) = client.snapshot().await?;
    for line in render(&ring, &events, &args)? {
        println!("{}", line);
    }
    Ok(())
}

fn render(ring: &RingStats, events: &[Event], args: &RingArgs) -> Result<Vec<String>> {
    let skip = args
        .tail
        .map_or(0, |tail| events.len().saturating_sub(tail));

    let mut lines = Vec::with_capacity(events.len() - skip + 1);
    if args.format == OutputFormat::Text {
        lines.push(format!(
            "ring: cur_seq={} capacity={} oldest={} retained={}",
            ring.cur_seq,
            ring.capacity,
            oldest_retained(ring.cur_seq, ring.capacity),
            events.len()
        ));
    }
    for event in &events[skip..] {
        lines.push(output::event_line(event, args.format)?);
    }
    Ok(lines)
}
