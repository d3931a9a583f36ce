//! Error reporting specs
//!
//! Verify failures explain themselves and never leave a daemon behind.

use crate::prelude::*;

#[test]
fn status_without_daemon_suggests_starting_one() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["status"])
        .fails()
        .stderr_has("error: Daemon not running")
        .stderr_has("oscope daemon start");
    assert!(!temp.socket_path().exists());
}

#[test]
fn bad_start_position_is_a_usage_error() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["dump", "--from", "yesterday"])
        .fails()
        .stderr_has("now|oldest|seq:<N>");
}

#[test]
fn zero_batch_is_a_usage_error() {
    let temp = Project::empty();
    temp.oscope().args(&["dump", "--batch", "0"]).fails();
}

#[test]
fn emit_requires_a_path() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["emit"])
        .fails()
        .stderr_has("a path is required");
}

#[test]
fn emit_rejects_oversized_command_name() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["emit", "/x", "--comm", "a-much-too-long-command"])
        .fails()
        .stderr_has("--comm must be at most 16 bytes");
}

#[test]
fn dump_rejects_oversized_comm_filter() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["dump", "--comm", "a-much-too-long-command"])
        .fails()
        .stderr_has("Invalid argument");
}
