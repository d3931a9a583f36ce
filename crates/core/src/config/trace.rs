// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ring owner configuration (`oscope.toml`)
//!
//! ```toml
//! capacity = 4096
//!
//! [ingest]
//! tgid = 1234
//! comm = "nginx"
//! ```

use crate::error::TraceError;
use crate::filter::{Filter, RawFilter};
use crate::ring::{RingBuffer, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML syntax error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] TraceError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Number of events the ring retains
    pub capacity: usize,
    /// Applied to every call before it is pushed
    pub ingest: RawFilter,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ingest: RawFilter::default(),
        }
    }
}

impl TraceConfig {
    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: TraceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), TraceError> {
        if self.capacity == 0 {
            return Err(TraceError::invalid("capacity must be at least 1"));
        }
        Filter::from_raw(&self.ingest).map(|_| ())
    }

    pub fn ingest_filter(&self) -> Result<Filter, TraceError> {
        Filter::from_raw(&self.ingest)
    }

    pub fn build_ring(&self) -> Result<Arc<RingBuffer>, TraceError> {
        RingBuffer::new(self.capacity).map(Arc::new)
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
