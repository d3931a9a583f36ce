//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status lifecycle.

use crate::prelude::*;

#[test]
fn daemon_status_reports_not_running() {
    let temp = Project::empty();

    temp.oscope()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();

    temp.oscope()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
}

#[test]
fn daemon_start_twice_reuses_running_daemon() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon already running");
}

#[test]
fn daemon_status_shows_running_details() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has("Version:")
        .stdout_has("Uptime:")
        .stdout_has("Readers:")
        .stdout_has("Capacity: 1024");
}

#[test]
fn daemon_stop_reports_success() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
}

#[test]
fn daemon_status_reports_not_running_after_stop() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope().args(&["daemon", "stop"]).passes();
    temp.oscope()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_stop_without_daemon_is_harmless() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_creates_runtime_files() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();

    let daemon_dir = temp.daemon_dir();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        daemon_dir.join("daemon.version").exists() && daemon_dir.join("daemon.pid").exists()
    }));
    assert!(temp.socket_path().exists());
}

#[test]
fn daemon_stop_removes_runtime_files() {
    let temp = Project::empty();
    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope().args(&["daemon", "stop"]).passes();

    let daemon_dir = temp.daemon_dir();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        !temp.socket_path().exists() && !daemon_dir.join("daemon.pid").exists()
    }));
}

#[test]
fn daemon_start_shows_config_error() {
    let temp = Project::empty();
    let config = temp.file("bad.toml", "capacity = 0\n");

    temp.oscope()
        .args(&["daemon", "start", "--config", &config.display().to_string()])
        .fails()
        .stderr_has("Failed to start daemon")
        .stderr_has("capacity must be at least 1");
    assert!(!temp.socket_path().exists());
}

#[test]
fn daemon_reads_default_config_from_state_dir() {
    let temp = Project::empty();
    temp.file("state/oscope/oscope.toml", "capacity = 16\n");

    temp.oscope().args(&["daemon", "start"]).passes();
    temp.oscope()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Capacity: 16");
}
