// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{BlobError, BlobStore};

/// Blob backend held entirely in memory.
pub struct InMemoryBlobStore {
    data: DashMap<String, Vec<u8>>,
    writes: AtomicU64,
    removes: AtomicU64,
}

impl InMemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            writes: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    /// Get current blob count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All stored paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.data.iter().map(|r| r.key().clone()).collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.data.get(path).map(|r| r.value().clone())
    }

    /// Number of write calls served (including overwrites).
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of remove calls served (including misses).
    #[must_use]
    pub fn remove_count(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), BlobError> {
        if path.is_empty() {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), BlobError> {
        self.removes.fetch_add(1, Ordering::Relaxed);
        self.data.remove(path);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.get(path))
    }

    async fn exists(&self, path: &str) -> Result<bool, BlobError> {
        Ok(self.data.contains_key(path))
    }
}
