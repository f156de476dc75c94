// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::batch::MetadataBatch;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Malformed value in {container} for '{key}': {value:?}")]
    Malformed {
        container: String,
        key: String,
        value: String,
    },
}

impl From<redis::RedisError> for StorageError {
    fn from(e: redis::RedisError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Everything the pipeline needs to know about one key, read together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    /// Current value of the source key; `None` if it does not exist.
    pub content: Option<Vec<u8>>,
    /// Last recorded modtime (ms).
    pub modtime: Option<i64>,
    /// Last recorded fingerprint, as stored.
    pub sha: Option<String>,
}

/// The key-value store the archiver drains and records into.
///
/// Implementations are bound to one [`KeySpace`](crate::keyspace::KeySpace).
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Atomically move one key from the pending list to the in-flight list,
    /// waiting up to `timeout` for one to arrive.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StorageError>;

    /// Read the source value and the recorded modtime/fingerprint of `key`.
    async fn fetch(&self, key: &str) -> Result<KeyState, StorageError>;

    /// Apply every mutation in `batch` as one indivisible unit.
    async fn apply(&self, batch: &MetadataBatch) -> Result<(), StorageError>;
}

/// Parse a recorded modtime.
pub(crate) fn parse_modtime(
    container: &str,
    key: &str,
    raw: Option<String>,
) -> Result<Option<i64>, StorageError> {
    raw.map(|s| {
        s.trim().parse::<i64>().map_err(|_| StorageError::Malformed {
            container: container.to_string(),
            key: key.to_string(),
            value: s.clone(),
        })
    })
    .transpose()
}
