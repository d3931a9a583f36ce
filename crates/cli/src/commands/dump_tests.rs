// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;

#[derive(Parser)]
struct Harness {
    #[command(flatten)]
    dump: DumpArgs,
}

fn parse(args: &[&str]) -> Result<DumpArgs, clap::Error> {
    Harness::try_parse_from(std::iter::once("dump").chain(args.iter().copied())).map(|h| h.dump)
}

#[test]
fn defaults_follow_new_events_as_json() {
    let args = parse(&[]).unwrap();
    assert_eq!(args.from, StartPosition::Now);
    assert_eq!(args.batch, 256);
    assert_eq!(args.stats_every, 0);
    assert_eq!(args.format, OutputFormat::Json);
    assert_eq!(args.filter(), RawFilter::default());
}

#[test]
fn filter_flags_fill_raw_filter() {
    let args = parse(&["--tgid", "42", "--comm", "nginx", "--from", "seq:10"]).unwrap();
    assert_eq!(
        args.filter(),
        RawFilter {
            pid: RawFilter::ANY,
            tgid: 42,
            comm: "nginx".to_string(),
        }
    );
    assert_eq!(args.from, StartPosition::At(10));
}

#[test]
fn bad_arguments_are_rejected_by_parser() {
    assert!(parse(&["--from", "yesterday"]).is_err());
    assert!(parse(&["--batch", "0"]).is_err());
    assert!(parse(&["--format", "xml"]).is_err());
}

#[test]
fn stats_line_on_schedule_or_when_drops_move() {
    // No schedule: only drop changes count
    assert!(!stats_due(1, 0, 0, 0));
    assert!(stats_due(1, 0, 5, 0));
    assert!(!stats_due(2, 0, 5, 5));

    // Every third drain, plus any drop change in between
    assert!(!stats_due(1, 3, 0, 0));
    assert!(stats_due(3, 3, 0, 0));
    assert!(stats_due(4, 3, 9, 0));
}

#[test]
fn perf_waits_a_full_period() {
    let start = Instant::now();
    let mut perf = PerfReport::new(start);
    let counters = Counters {
        wakes: 1,
        ..Counters::default()
    };
    assert_eq!(perf.tick(start + Duration::from_millis(999), &counters), None);
}

#[test]
fn perf_reports_rates_since_last_report() {
    let start = Instant::now();
    let mut perf = PerfReport::new(start);
    let first = Counters {
        wakes: 10,
        drains: 10,
        reads: 40,
        events: 300,
        would_block: 10,
    };
    let line = perf.tick(start + Duration::from_secs(2), &first).unwrap();
    assert_eq!(
        line,
        "[perf] wake/s=5.0 drain/s=5.0 read/s=20.0 events/s=150.0 events/read=7.50 wouldblock/read=0.25"
    );

    // Only the delta since the previous report counts
    let second = Counters {
        wakes: 11,
        drains: 11,
        reads: 41,
        events: 300,
        would_block: 11,
    };
    let line = perf
        .tick(start + Duration::from_secs(3), &second)
        .unwrap();
    assert!(line.contains("read/s=1.0"), "{}", line);
    assert!(line.contains("events/read=0.00"), "{}", line);
    assert!(line.contains("wouldblock/read=1.00"), "{}", line);
}

#[test]
fn perf_with_no_reads_has_zero_ratios() {
    let start = Instant::now();
    let mut perf = PerfReport::new(start);
    let line = perf
        .tick(start + Duration::from_secs(1), &Counters::default())
        .unwrap();
    assert!(line.contains("events/read=0.00 wouldblock/read=0.00"), "{}", line);
}
