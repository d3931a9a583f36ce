//! Daemon logs specs
//!
//! Verify daemon logs command behavior.

use crate::prelude::*;

#[test]
fn daemon_logs_shows_startup_marker() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();

    temp.oscope()
        .args(&["daemon", "logs", "--lines", "10"])
        .passes()
        .stdout_has("oscoped: starting");
}

#[test]
fn daemon_logs_shows_startup_info() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();

    let log = temp.daemon_dir().join("daemon.log");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_to_string(&log)
            .map(|content| content.contains("Daemon ready"))
            .unwrap_or(false)
    }));
    temp.oscope()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("Daemon ready");
}

#[test]
fn daemon_logs_without_log_file() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("No daemon log");
}
