// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::{Event, FixedText};
use crate::ring::RingBuffer;
use std::sync::Arc;

fn setup(capacity: usize) -> (Arc<RingBuffer>, Reader) {
    let ring = Arc::new(RingBuffer::new(capacity).unwrap());
    let reader = Reader::attach(&ring);
    (ring, reader)
}

fn push(ring: &RingBuffer, tgid: i32, comm: &str) -> u64 {
    ring.push(Event {
        pid: tgid,
        tgid,
        comm: FixedText::from(comm),
        ..Event::default()
    })
}

#[test]
fn stats_report_ring_head_and_own_drops() {
    let (ring, mut reader) = setup(4);
    for _ in 0..6 {
        push(&ring, 1, "a");
    }
    assert_eq!(
        reader.stats(),
        ReaderStats {
            cur_seq: 6,
            dropped: 0,
            capacity: 4
        }
    );

    reader.try_read(8).unwrap();
    assert_eq!(reader.stats().dropped, 2);
}

#[test]
fn stats_do_not_move_cursor() {
    let (ring, reader) = setup(4);
    push(&ring, 1, "a");
    reader.stats();
    assert_eq!(reader.cursor().next_seq(), 0);
}

#[test]
fn set_filter_keeps_drop_count() {
    let (ring, mut reader) = setup(2);
    for _ in 0..5 {
        push(&ring, 1, "a");
    }
    reader.try_read(8).unwrap();
    assert_eq!(reader.stats().dropped, 3);

    reader.set_filter(Filter::all().tgid(9));
    assert_eq!(reader.stats().dropped, 3);
}

#[test]
fn set_filter_applies_to_next_read_only() {
    let (ring, mut reader) = setup(16);
    push(&ring, 1, "a");
    let delivered = reader.try_read(8).unwrap();
    assert_eq!(delivered.len(), 1);

    reader.set_filter(Filter::all().comm("b").unwrap());
    push(&ring, 1, "a");
    let seq = push(&ring, 1, "b");

    let events = reader.try_read(8).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, seq);
}

#[test]
fn set_start_resets_position_and_drops() {
    let (ring, mut reader) = setup(4);
    for _ in 0..10 {
        push(&ring, 1, "a");
    }
    reader.try_read(1).unwrap();
    assert_eq!(reader.stats().dropped, 6);

    reader.set_start(StartPosition::At(8));
    assert_eq!(reader.stats().dropped, 0);
    let seqs: Vec<u64> = reader.try_read(8).unwrap().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![8, 9]);
}

#[test]
fn set_start_now_skips_backlog() {
    let (ring, mut reader) = setup(8);
    push(&ring, 1, "a");
    reader.set_start(StartPosition::Now);
    assert_eq!(reader.try_read(8), Err(TraceError::WouldBlock));
}

#[test]
fn invalid_raw_filter_leaves_reader_untouched() {
    let (_ring, mut reader) = setup(8);
    reader.set_filter(Filter::all().pid(3));

    let raw = RawFilter {
        pid: 5,
        tgid: -9,
        comm: String::new(),
    };
    assert!(matches!(
        reader.set_filter_raw(&raw),
        Err(TraceError::InvalidArgument(_))
    ));
    assert_eq!(reader.cursor().filter(), &Filter::all().pid(3));
}

#[test]
fn invalid_raw_start_leaves_reader_untouched() {
    let (ring, mut reader) = setup(8);
    push(&ring, 1, "a");
    let before = reader.cursor().clone();

    assert!(matches!(
        reader.set_start_raw(RawStart { mode: 9, seq: 0 }),
        Err(TraceError::InvalidArgument(_))
    ));
    assert_eq!(reader.cursor(), &before);
}

#[test]
fn raw_start_oldest_rewinds() {
    let (ring, mut reader) = setup(8);
    push(&ring, 1, "a");
    push(&ring, 1, "a");

    reader
        .set_start_raw(RawStart {
            mode: RawStart::OLDEST,
            seq: 0,
        })
        .unwrap();
    assert_eq!(reader.try_read(8).unwrap().len(), 2);
}
