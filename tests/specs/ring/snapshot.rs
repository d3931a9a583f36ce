//! Ring snapshot and producer specs
//!
//! Verify emitted calls land in the ring and `oscope ring` shows them
//! without consuming anything.

use crate::prelude::*;

#[test]
fn emit_reports_assigned_sequence() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["emit", "/etc/hosts"])
        .passes()
        .stdout_has("Ingested seq 0");
    temp.oscope()
        .args(&["emit", "/etc/hosts"])
        .passes()
        .stdout_has("Ingested seq 1");
}

#[test]
fn ring_lists_retained_events_as_text() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["emit", "/etc/passwd", "--tgid", "77", "--comm", "cat"])
        .passes();

    temp.oscope()
        .args(&["ring"])
        .passes()
        .stdout_has("ring: cur_seq=1 capacity=1024 oldest=0 retained=1")
        .stdout_has("[0] pid=77 tgid=77 comm=cat")
        .stdout_has("path=/etc/passwd");
}

#[test]
fn ring_json_lines_follow_record_shape() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["emit", "/tmp/a\"b", "--flags", "524288", "--mode", "420"])
        .passes();

    let run = temp.oscope().args(&["ring", "--format", "json"]).passes();
    let records = run.json_lines();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["type"], "openat");
    assert_eq!(record["seq"], 0);
    assert_eq!(record["dfd"], -100);
    assert_eq!(record["flags"], 524288);
    assert_eq!(record["mode"], 420);
    assert_eq!(record["comm"], "oscope");
    assert_eq!(record["path"], "/tmp/a\"b");
    assert!(record["ts_ns"].is_u64());
}

#[test]
fn ring_is_not_consumed_by_reading_it() {
    let temp = Project::empty();
    temp.oscope().args(&["emit", "/x", "--count", "3"]).passes();

    for _ in 0..2 {
        let run = temp.oscope().args(&["ring", "--format", "json"]).passes();
        assert_eq!(run.json_lines().len(), 3);
    }
}

#[test]
fn full_ring_keeps_newest_capacity_events() {
    let temp = Project::empty();
    temp.file("state/oscope/oscope.toml", "capacity = 4\n");
    temp.oscope().args(&["emit", "/x", "--count", "6"]).passes();

    temp.oscope()
        .args(&["ring"])
        .passes()
        .stdout_has("ring: cur_seq=6 capacity=4 oldest=2 retained=4")
        .stdout_has("[2] ")
        .stdout_has("[5] ")
        .stdout_lacks("[1] ");
}

#[test]
fn unreadable_path_is_recorded_as_sentinel() {
    let temp = Project::empty();
    temp.oscope().args(&["emit", "--unreadable"]).passes();

    temp.oscope()
        .args(&["ring"])
        .passes()
        .stdout_has("path=<badptr>");
}

#[test]
fn ingest_filter_discards_other_processes() {
    let temp = Project::empty();
    temp.file("state/oscope/oscope.toml", "[ingest]\ntgid = 7\n");

    temp.oscope()
        .args(&["emit", "/kept", "--tgid", "7"])
        .passes()
        .stdout_has("Ingested seq 0");
    temp.oscope()
        .args(&["emit", "/dropped", "--tgid", "8"])
        .passes()
        .stdout_has("Discarded by ingest filter");

    temp.oscope()
        .args(&["status"])
        .passes()
        .stdout_has("Accepted: 1")
        .stdout_has("Discarded: 1");
    temp.oscope()
        .args(&["ring"])
        .passes()
        .stdout_lacks("/dropped");
}

#[test]
fn status_json_has_counters() {
    let temp = Project::empty();
    temp.oscope().args(&["emit", "/x", "--count", "2"]).passes();

    let run = temp.oscope().args(&["status", "--format", "json"]).passes();
    let status: serde_json::Value = serde_json::from_str(&run.stdout()).unwrap();
    assert_eq!(status["cur_seq"], 2);
    assert_eq!(status["capacity"], 1024);
    assert_eq!(status["accepted"], 2);
}
