// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Writes and removes the blob triple for one archived version.

use std::sync::Arc;

use tracing::instrument;

use super::traits::{BlobError, BlobStore};
use crate::compression::compress_with_stats;
use crate::path_format::{latest_path, BlobPaths};

/// Outcome of [`BlobWriter::write_version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenVersion {
    pub original_bytes: usize,
    pub compressed_bytes: usize,
}

/// Thin layer over a [`BlobStore`] that knows the archive layout.
#[derive(Clone)]
pub struct BlobWriter {
    store: Arc<dyn BlobStore>,
}

impl BlobWriter {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Compress `content` once and write it to the latest, history and
    /// dedup paths in that order.
    ///
    /// The three writes are independent; a failure part-way leaves earlier
    /// paths written. Every write is idempotent, so reprocessing the same
    /// version repairs it.
    #[instrument(skip(self, content), fields(latest = %paths.latest))]
    pub async fn write_version(
        &self,
        paths: &BlobPaths,
        content: &[u8],
    ) -> Result<WrittenVersion, BlobError> {
        let (compressed, stats) = compress_with_stats(content)?;

        for path in [&paths.latest, &paths.history, &paths.dedup] {
            self.store.write(path, &compressed).await?;
        }
        crate::metrics::record_blob_bytes(compressed.len() * 3);

        Ok(WrittenVersion {
            original_bytes: stats.original_bytes,
            compressed_bytes: stats.compressed_bytes,
        })
    }

    /// Remove the latest copy of `key`. History and dedup copies are kept.
    pub async fn remove_latest(&self, key: &str) -> Result<String, BlobError> {
        let path = latest_path(key);
        self.store.remove(&path).await?;
        Ok(path)
    }
}
