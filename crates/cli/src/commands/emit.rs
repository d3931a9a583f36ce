// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oscope emit <path>` - Submit synthetic open calls as a producer

use anyhow::{bail, Result};
use clap::Args;
use oscope_core::{CallSite, FixedText, OpenCall, COMM_LEN};

use crate::client::DaemonClient;

/// `AT_FDCWD`: path is relative to the working directory
const AT_FDCWD: i32 = -100;

#[derive(Args)]
pub struct EmitArgs {
    /// Path that was opened
    pub path: Option<String>,

    /// Record the path as unreadable instead
    #[arg(long, conflicts_with = "path")]
    pub unreadable: bool,

    /// Thread id of the caller (defaults to this process)
    #[arg(long)]
    pub pid: Option<i32>,

    /// Process id of the caller (defaults to this process)
    #[arg(long)]
    pub tgid: Option<i32>,

    /// Command name of the caller
    #[arg(long, default_value = "oscope")]
    pub comm: String,

    #[arg(long, default_value_t = AT_FDCWD, allow_negative_numbers = true)]
    pub dfd: i32,

    #[arg(long, default_value = "0")]
    pub flags: i32,

    #[arg(long, default_value = "0")]
    pub mode: u32,

    /// Submit the same call this many times
    #[arg(long, default_value = "1")]
    pub count: u64,
}

impl EmitArgs {
    fn site(&self) -> Result<CallSite> {
        if !FixedText::<COMM_LEN>::fits(&self.comm) {
            bail!("--comm must be at most {} bytes", COMM_LEN);
        }
        let own = std::process::id() as i32;
        let tgid = self.tgid.unwrap_or(own);
        Ok(CallSite::new(self.pid.unwrap_or(tgid), tgid, &self.comm))
    }

    fn call(&self) -> OpenCall {
        OpenCall {
            dir_fd: self.dfd,
            flags: self.flags,
            mode: self.mode,
        }
    }

    fn path(&self) -> Result<Option<String>> {
        match (&self.path, self.unreadable) {
            (_, true) => Ok(None),
            (Some(path), false) => Ok(Some(path.clone())),
            (None, false) => bail!("a path is required unless --unreadable is given"),
        }
    }
}

pub async fn handle(args: EmitArgs) -> Result<()> {
    let site = args.site()?;
    let call = args.call();
    let path = args.path()?;

    let client = DaemonClient::connect_or_start().await?;
    let mut conn = client.open().await?;
    let mut accepted = 0u64;
    let mut last_seq = None;
    for _ in 0..args.count {
        if let Some(seq) = conn.ingest(site, call, path.clone()).await? {
            accepted += 1;
            last_seq = Some(seq);
        }
    }

    match (args.count, last_seq) {
        (1, Some(seq)) => println!("Ingested seq {}", seq),
        (_, Some(seq)) => println!("Ingested {} of {} (last seq {})", accepted, args.count, seq),
        (_, None) => println!("Discarded by ingest filter"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        emit: EmitArgs,
    }

    fn parse(args: &[&str]) -> EmitArgs {
        Harness::try_parse_from(std::iter::once("emit").chain(args.iter().copied()))
            .unwrap()
            .emit
    }

    #[test]
    fn defaults_describe_this_process() {
        let args = parse(&["/etc/hosts"]);
        let site = args.site().unwrap();
        assert_eq!(site.tgid, std::process::id() as i32);
        assert_eq!(site.pid, site.tgid);
        assert_eq!(site.comm.as_bytes(), b"oscope");
        assert_eq!(args.call().dir_fd, AT_FDCWD);
        assert_eq!(args.path().unwrap().as_deref(), Some("/etc/hosts"));
    }

    #[test]
    fn explicit_caller_identity() {
        let args = parse(&["/x", "--pid", "12", "--tgid", "10", "--comm", "bash"]);
        let site = args.site().unwrap();
        assert_eq!((site.pid, site.tgid), (12, 10));
        assert_eq!(site.comm.as_bytes(), b"bash");
    }

    #[test]
    fn unreadable_sends_no_path() {
        let args = parse(&["--unreadable"]);
        assert_eq!(args.path().unwrap(), None);
    }

    #[test]
    fn missing_path_and_long_comm_are_errors() {
        assert!(parse(&[]).path().is_err());
        assert!(parse(&["/x", "--comm", "a-command-name-too-long"]).site().is_err());
    }
}
