// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;

use crate::compression::CompressionError;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid blob path '{0}'")]
    InvalidPath(String),
    #[error("Unknown blob store type '{name}' (registered: {registered})")]
    UnknownBackend { name: String, registered: String },
    #[error("Blob backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Compression(#[from] CompressionError),
}

/// Capability interface every blob backend provides.
///
/// Paths are `/`-separated relative names produced by
/// [`path_format`](crate::path_format). Writes replace any existing blob
/// at the path; removing a missing blob succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), BlobError>;
    async fn remove(&self, path: &str) -> Result<(), BlobError>;
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, BlobError>;

    async fn exists(&self, path: &str) -> Result<bool, BlobError> {
        Ok(self.read(path).await?.is_some())
    }
}
