//! Shared helpers for black-box CLI specs
//!
//! Every spec runs against its own state and socket directories, so
//! daemons started by different specs never see each other.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Upper bound for polling on asynchronous effects
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

const SPEC_POLL_MS: u64 = 20;

/// Poll `check` until it holds or `max_ms` passes
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(SPEC_POLL_MS));
    }
}

fn binary(name: &str) -> PathBuf {
    assert_cmd::cargo::cargo_bin(name)
}

/// Isolated environment; stops its daemon on drop
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Value of XDG_STATE_HOME for commands run here
    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    /// Where oscoped keeps its pid, version and log files
    pub fn daemon_dir(&self) -> PathBuf {
        self.state_path().join("oscope")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join("sock").join("oscoped.sock")
    }

    /// Write `content` to `rel`, creating parent directories
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    pub fn oscope(&self) -> CliBuilder {
        let mut cmd = Command::new(binary("oscope"));
        cmd.current_dir(self.dir.path())
            .env("XDG_STATE_HOME", self.state_path())
            .env("OSCOPE_SOCKET_DIR", self.dir.path().join("sock"))
            .env("OSCOPE_DAEMON_BINARY", binary("oscoped"))
            .env_remove("OSCOPE_LOG");
        CliBuilder { cmd }
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = self.oscope().args(&["daemon", "stop"]).cmd.output();
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    fn run(mut self) -> RunAssert {
        let output = self.cmd.output().expect("run oscope");
        RunAssert { output }
    }

    /// Run and require exit status 0
    pub fn passes(self) -> RunAssert {
        let run = self.run();
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\nstdout:\n{}\nstderr:\n{}",
            run.output.status,
            run.stdout(),
            run.stderr()
        );
        run
    }

    /// Run and require a nonzero exit status
    pub fn fails(self) -> RunAssert {
        let run = self.run();
        assert!(
            !run.output.status.success(),
            "expected failure\nstdout:\n{}\nstderr:\n{}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let out = self.stdout();
        assert!(out.contains(needle), "stdout lacks {:?}:\n{}", needle, out);
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        let out = self.stdout();
        assert!(!out.contains(needle), "stdout has {:?}:\n{}", needle, out);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let err = self.stderr();
        assert!(err.contains(needle), "stderr lacks {:?}:\n{}", needle, err);
        self
    }

    pub fn stderr_lacks(self, needle: &str) -> Self {
        let err = self.stderr();
        assert!(!err.contains(needle), "stderr has {:?}:\n{}", needle, err);
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    /// Parse each stdout line as JSON
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout()
            .lines()
            .map(|line| serde_json::from_str(line).expect("stdout line is JSON"))
            .collect()
    }
}
