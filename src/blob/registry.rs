// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Named blob backend factories.
//!
//! The backend is chosen once at startup from `blob_store_type`. Embedders
//! can register their own factories (object stores, etc.) before building.
//!
//! ```
//! use redis_archiver::blob::BlobStoreRegistry;
//! use redis_archiver::config::BlobStoreOptions;
//!
//! let registry = BlobStoreRegistry::with_defaults();
//! assert!(registry.create("memory", &BlobStoreOptions::default()).is_ok());
//! assert!(registry.create("gcs", &BlobStoreOptions::default()).is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::fs::FsBlobStore;
use super::memory::InMemoryBlobStore;
use super::traits::{BlobError, BlobStore};
use crate::config::BlobStoreOptions;

pub type BlobStoreFactory =
    Box<dyn Fn(&BlobStoreOptions) -> Result<Arc<dyn BlobStore>, BlobError> + Send + Sync>;

pub struct BlobStoreRegistry {
    factories: HashMap<String, BlobStoreFactory>,
}

impl BlobStoreRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `fs` and `memory` backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("fs", |opts| {
            Ok(Arc::new(FsBlobStore::new(opts.path.clone())) as Arc<dyn BlobStore>)
        });
        registry.register("memory", |_| {
            Ok(Arc::new(InMemoryBlobStore::new()) as Arc<dyn BlobStore>)
        });
        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&BlobStoreOptions) -> Result<Arc<dyn BlobStore>, BlobError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn create(
        &self,
        name: &str,
        options: &BlobStoreOptions,
    ) -> Result<Arc<dyn BlobStore>, BlobError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BlobError::UnknownBackend {
                name: name.to_string(),
                registered: self.names().join(", "),
            })?;
        factory(options)
    }

    /// Registered backend names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for BlobStoreRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
