// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Archiver coordinator.
//!
//! The [`Archiver`] owns every collaborator explicitly (store, blob writer,
//! clock, metadata updater) and processes one key at a time:
//!
//! ```text
//! dequeue → fetch → classify → write/remove blobs → apply metadata batch
//! ```
//!
//! A key whose processing fails stays in the in-flight list; the loop moves
//! on to the next key.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use redis_archiver::{Archiver, ArchiverConfig, BlobStoreRegistry, RedisStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ArchiverConfig::default();
//! let blobs = BlobStoreRegistry::with_defaults().create(&config.blob_store_type, &config.blob_store)?;
//! let store = RedisStore::new(&config.redis_url(), config.keyspace()).await?;
//!
//! let archiver = Archiver::new(&config, Arc::new(store), blobs);
//! let summary = archiver.run().await;
//! println!("stopped: {}", summary.exit);
//! # Ok(())
//! # }
//! ```

mod error;
mod lifecycle;
mod metadata;
mod types;

pub use error::ArchiveError;
pub use metadata::MetadataUpdater;
pub use types::{ExitReason, Outcome, RunStats, RunSummary};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::blob::{BlobStore, BlobWriter};
use crate::clock::{assign_timestamp, Clock, SystemClock};
use crate::config::{ArchiverConfig, ExitPolicy, Mode};
use crate::fingerprint::{classify, Fingerprint, Transition};
use crate::keyspace::KeySpace;
use crate::path_format::BlobPaths;
use crate::store::SourceStore;

pub struct Archiver {
    pub(super) store: Arc<dyn SourceStore>,
    pub(super) blobs: BlobWriter,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) metadata: MetadataUpdater,
    pub(super) keys: KeySpace,
    pub(super) mode: Mode,
    pub(super) exit: ExitPolicy,
    pub(super) pop_timeout: Duration,
}

impl Archiver {
    /// Build an archiver using the system clock.
    ///
    /// `store` must be bound to the same key space as `config.keyspace()`.
    pub fn new(
        config: &ArchiverConfig,
        store: Arc<dyn SourceStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let keys = config.keyspace();
        Self {
            store,
            blobs: BlobWriter::new(blobs),
            clock: Arc::new(SystemClock),
            metadata: MetadataUpdater::new(keys.clone(), config.mode, config.completion()),
            keys,
            mode: config.mode,
            exit: config.exit,
            pop_timeout: config.pop_timeout(),
        }
    }

    /// Replace the wall clock (tests, replay tooling).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keys
    }

    /// Run the full pipeline for one dequeued key.
    ///
    /// On error nothing is acknowledged; blobs already written stay written
    /// (they are idempotent) and no metadata is recorded.
    #[instrument(skip(self), fields(snapshot = %self.keys.snapshot_id()))]
    pub async fn process_key(&self, key: &str) -> Result<Outcome, ArchiveError> {
        if key.is_empty() {
            return Err(ArchiveError::data("refusing to archive an empty key", b""));
        }

        let now = self.clock.now_millis();
        let state = self.store.fetch(key).await?;
        let timestamp = assign_timestamp(now, state.modtime);

        match classify(state.content.as_deref(), state.sha.as_deref()) {
            Transition::Unchanged => {
                self.store.apply(&self.metadata.acknowledge(key)).await?;
                debug!(key, sha = ?state.sha, "Content unchanged");
                Ok(Outcome::Unchanged)
            }
            Transition::Deleted => self.archive_deletion(key, timestamp).await,
            Transition::Changed(sha) => {
                let content = state.content.unwrap_or_default();
                self.archive_version(key, &content, sha, timestamp).await
            }
        }
    }

    async fn archive_version(
        &self,
        key: &str,
        content: &[u8],
        sha: Fingerprint,
        timestamp: i64,
    ) -> Result<Outcome, ArchiveError> {
        let doc: serde_json::Value = serde_json::from_slice(content).map_err(|e| {
            ArchiveError::data(format!("content of '{}' is not valid JSON: {}", key, e), content)
        })?;
        let paths = BlobPaths::new(key, timestamp, &sha);

        debug!(
            key,
            latest = %paths.latest,
            history = %paths.history,
            dedup = %paths.dedup,
            sha = %sha,
            timestamp,
            content = %doc,
            "Archiving version"
        );

        let written = self.blobs.write_version(&paths, content).await?;
        self.store
            .apply(&self.metadata.changed(key, timestamp, &sha))
            .await?;

        debug!(
            key,
            original_bytes = written.original_bytes,
            compressed_bytes = written.compressed_bytes,
            "Version recorded"
        );
        Ok(Outcome::Changed { timestamp, sha, paths })
    }

    async fn archive_deletion(&self, key: &str, timestamp: i64) -> Result<Outcome, ArchiveError> {
        let latest = self.blobs.remove_latest(key).await?;
        debug!(key, latest = %latest, timestamp, "Archiving deletion");

        self.store
            .apply(&self.metadata.deleted(key, timestamp))
            .await?;
        Ok(Outcome::Deleted { timestamp, latest })
    }
}
