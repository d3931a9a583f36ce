//! Help output specs
//!
//! Verify the command surface is discoverable from --help.

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["--help"])
        .passes()
        .stdout_has("dump")
        .stdout_has("emit")
        .stdout_has("status")
        .stdout_has("ring")
        .stdout_has("daemon");
}

#[test]
fn version_flag_prints_version() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn dump_help_lists_filter_and_start_options() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["dump", "--help"])
        .passes()
        .stdout_has("--pid")
        .stdout_has("--tgid")
        .stdout_has("--comm")
        .stdout_has("--from")
        .stdout_has("--stats-every")
        .stdout_has("--batch")
        .stdout_has("--perf")
        .stdout_has("--quiet");
}

#[test]
fn daemon_help_lists_subcommands() {
    let temp = Project::empty();
    temp.oscope()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status")
        .stdout_has("logs");
}
