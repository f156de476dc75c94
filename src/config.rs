// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the archiver.
//!
//! # Example
//!
//! ```
//! use redis_archiver::{ArchiverConfig, CompletionPolicy};
//!
//! // Minimal config (uses defaults)
//! let config = ArchiverConfig::default();
//! assert_eq!(config.namespace, "r8");
//! assert_eq!(config.completion(), CompletionPolicy::DeleteSource);
//!
//! // Hand processed keys to a downstream worker instead
//! let config = ArchiverConfig {
//!     outq: Some("indexer:q".into()),
//!     snapshot_id: "2026-10".into(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::keyspace::KeySpace;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'outq' and 'expire' are mutually exclusive")]
    ConflictingCompletion,
    #[error("'{0}' must not be empty")]
    Empty(&'static str),
    #[error("'expire' must be at least one second")]
    ZeroExpiry,
    #[error("'expire' of {0} seconds is out of range")]
    ExpiryOutOfRange(u64),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Full bookkeeping including per-generation history entries.
    #[default]
    Snapshot,
    /// Fingerprint/tombstone bookkeeping only; history entries are skipped.
    Minimal,
}

/// When the dispatch loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Stop as soon as a dequeue times out with nothing pending.
    Empty,
    /// Keep polling until the sentinel key arrives.
    #[default]
    Never,
}

/// What happens to the source key once a new version has been archived.
///
/// Resolved once from `outq`/`expire` by [`ArchiverConfig::completion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Push the key onto a downstream list; the source key is left alone.
    OutputQueue(String),
    /// Let the source key expire after the given number of seconds.
    Expire(u64),
    /// Delete the source key.
    DeleteSource,
}

impl CompletionPolicy {
    /// The downstream list, if any. This is the only part of the policy
    /// that applies to deletions.
    #[must_use]
    pub fn output_queue(&self) -> Option<&str> {
        match self {
            Self::OutputQueue(q) => Some(q),
            _ => None,
        }
    }
}

/// Blob backend options, passed verbatim to the selected factory.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreOptions {
    /// Root directory for file-based backends.
    #[serde(default = "default_blob_path")]
    pub path: PathBuf,
}

impl Default for BlobStoreOptions {
    fn default() -> Self {
        Self { path: default_blob_path() }
    }
}

/// Configuration for the archiver.
///
/// All fields have defaults matching a local development setup.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiverConfig {
    /// Registered name of the blob backend (`fs` or `memory`)
    #[serde(default = "default_blob_store_type", alias = "blobStoreType")]
    pub blob_store_type: String,

    /// Options for the blob backend
    #[serde(default, alias = "blobStore")]
    pub blob_store: BlobStoreOptions,

    /// Redis host
    #[serde(default = "default_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Snapshot generation that history and tombstones are recorded under.
    /// Workers sharing a queue must agree on it.
    #[serde(default = "default_snapshot_id", alias = "snapshotId")]
    pub snapshot_id: String,

    /// Output list for processed keys
    #[serde(default)]
    pub outq: Option<String>,

    /// Expiry (seconds) to set on archived source keys
    #[serde(default)]
    pub expire: Option<u64>,

    #[serde(default)]
    pub mode: Mode,

    /// Redis key prefix (without the trailing colon)
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Default log filter, e.g. "info" or "debug"
    #[serde(default = "default_logger_level", alias = "loggerLevel")]
    pub logger_level: String,

    #[serde(default)]
    pub exit: ExitPolicy,

    /// How long a single dequeue blocks before re-polling
    #[serde(default = "default_pop_timeout_secs", alias = "popTimeoutSecs")]
    pub pop_timeout_secs: u64,
}

fn default_blob_store_type() -> String { "fs".to_string() }
fn default_blob_path() -> PathBuf { PathBuf::from("r8data/") }
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 6379 }
fn default_snapshot_id() -> String { "1".to_string() }
fn default_namespace() -> String { "r8".to_string() }
fn default_logger_level() -> String { "info".to_string() }
fn default_pop_timeout_secs() -> u64 { 1 }

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            blob_store_type: default_blob_store_type(),
            blob_store: BlobStoreOptions::default(),
            host: default_host(),
            port: default_port(),
            snapshot_id: default_snapshot_id(),
            outq: None,
            expire: None,
            mode: Mode::default(),
            namespace: default_namespace(),
            logger_level: default_logger_level(),
            exit: ExitPolicy::default(),
            pop_timeout_secs: default_pop_timeout_secs(),
        }
    }
}

impl ArchiverConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = std::fs::read(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outq.is_some() && self.expire.is_some() {
            return Err(ConfigError::ConflictingCompletion);
        }
        match self.expire {
            Some(0) => return Err(ConfigError::ZeroExpiry),
            Some(secs) if i64::try_from(secs).is_err() => {
                return Err(ConfigError::ExpiryOutOfRange(secs))
            }
            _ => {}
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Empty("namespace"));
        }
        if self.snapshot_id.is_empty() {
            return Err(ConfigError::Empty("snapshot_id"));
        }
        if matches!(self.outq.as_deref(), Some("")) {
            return Err(ConfigError::Empty("outq"));
        }
        Ok(())
    }

    /// Resolve the completion policy. `outq` wins over `expire` if both are
    /// set; [`validate`](Self::validate) rejects that combination anyway.
    #[must_use]
    pub fn completion(&self) -> CompletionPolicy {
        match (&self.outq, self.expire) {
            (Some(q), _) => CompletionPolicy::OutputQueue(q.clone()),
            (None, Some(secs)) => CompletionPolicy::Expire(secs),
            (None, None) => CompletionPolicy::DeleteSource,
        }
    }

    #[must_use]
    pub fn keyspace(&self) -> KeySpace {
        KeySpace::new(self.namespace.clone(), self.snapshot_id.clone())
    }

    #[must_use]
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_secs(self.pop_timeout_secs.max(1))
    }
}
