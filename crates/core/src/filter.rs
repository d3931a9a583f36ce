// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-site filters
//!
//! The same matcher serves two distinct purposes: each reader's private
//! delivery filter, and the ingest filter applied before an event is pushed.

use crate::error::TraceError;
use crate::event::{Event, FixedText, COMM_LEN};
use serde::{Deserialize, Serialize};

/// Exact-match constraints. An unset field matches every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    pid: Option<i32>,
    tgid: Option<i32>,
    comm: Option<FixedText<COMM_LEN>>,
}

impl Filter {
    /// Filter that matches everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn tgid(mut self, tgid: i32) -> Self {
        self.tgid = Some(tgid);
        self
    }

    /// Constrain the producer name; rejects names that would be truncated
    pub fn comm(mut self, comm: &str) -> Result<Self, TraceError> {
        if comm.is_empty() {
            self.comm = None;
            return Ok(self);
        }
        if !FixedText::<COMM_LEN>::fits(comm) {
            return Err(TraceError::invalid(format!(
                "comm filter longer than {} bytes: {:?}",
                COMM_LEN, comm
            )));
        }
        self.comm = Some(FixedText::from(comm));
        Ok(self)
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.pid.is_some_and(|pid| pid != event.pid) {
            return false;
        }
        if self.tgid.is_some_and(|tgid| tgid != event.tgid) {
            return false;
        }
        match &self.comm {
            Some(comm) => comm.as_bytes() == event.comm.as_bytes(),
            None => true,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.pid.is_none() && self.tgid.is_none() && self.comm.is_none()
    }

    /// Validate the sentinel form. Nothing is built unless every field is valid.
    pub fn from_raw(raw: &RawFilter) -> Result<Self, TraceError> {
        let mut filter = Filter::all();
        if let Some(pid) = raw_id("pid", raw.pid)? {
            filter = filter.pid(pid);
        }
        if let Some(tgid) = raw_id("tgid", raw.tgid)? {
            filter = filter.tgid(tgid);
        }
        filter.comm(&raw.comm)
    }

    pub fn to_raw(&self) -> RawFilter {
        RawFilter {
            pid: self.pid.unwrap_or(RawFilter::ANY),
            tgid: self.tgid.unwrap_or(RawFilter::ANY),
            comm: self
                .comm
                .map(|c| c.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

fn raw_id(field: &str, value: i32) -> Result<Option<i32>, TraceError> {
    match value {
        RawFilter::ANY => Ok(None),
        v if v < 0 => Err(TraceError::invalid(format!(
            "{} must be -1 or >= 0, got {}",
            field, v
        ))),
        v => Ok(Some(v)),
    }
}

/// Sentinel form of [`Filter`] used on the wire and in config files.
///
/// `-1` and the empty string mean "match all" for their field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFilter {
    pub pid: i32,
    pub tgid: i32,
    pub comm: String,
}

impl RawFilter {
    pub const ANY: i32 = -1;
}

impl Default for RawFilter {
    fn default() -> Self {
        Self {
            pid: Self::ANY,
            tgid: Self::ANY,
            comm: String::new(),
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
