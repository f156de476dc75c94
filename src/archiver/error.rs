// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

use crate::blob::BlobError;
use crate::store::StorageError;

/// Longest payload excerpt carried by a data error.
const MAX_PAYLOAD_BYTES: usize = 1024;

/// Why a key was abandoned.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The key or its content cannot be archived as-is.
    #[error("{message}")]
    Data { message: String, payload: String },
    #[error(transparent)]
    Store(#[from] StorageError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

impl ArchiveError {
    /// Build a data error, keeping at most 1 KiB of the payload.
    pub fn data(message: impl Into<String>, payload: &[u8]) -> Self {
        let cut = payload.len().min(MAX_PAYLOAD_BYTES);
        ArchiveError::Data {
            message: message.into(),
            payload: String::from_utf8_lossy(&payload[..cut]).into_owned(),
        }
    }

    /// Validation errors (bad content, malformed bookkeeping) as opposed to
    /// failures of the store or blob backend.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::Data { .. } | ArchiveError::Store(StorageError::Malformed { .. })
        )
    }

    /// The offending payload, for data errors.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            ArchiveError::Data { payload, .. } => Some(payload),
            ArchiveError::Store(StorageError::Malformed { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Metrics label: `data` or `backend`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        if self.is_data_error() { "data" } else { "backend" }
    }

    /// Metrics label: which collaborator the failure came from.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            ArchiveError::Data { .. } => "content",
            ArchiveError::Store(_) => "store",
            ArchiveError::Blob(_) => "blob",
        }
    }
}
