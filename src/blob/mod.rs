// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Blob backends.
//!
//! - [`traits`]: the [`BlobStore`] capability every backend implements
//! - [`fs`]: one file per blob under a root directory
//! - [`memory`]: DashMap-backed, for tests and dry runs
//! - [`registry`]: named factories resolved from `blob_store_type`
//! - [`writer`]: writes/removes the latest/history/dedup triple

pub mod fs;
pub mod memory;
pub mod registry;
pub mod traits;
pub mod writer;

pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use registry::{BlobStoreFactory, BlobStoreRegistry};
pub use traits::{BlobError, BlobStore};
pub use writer::{BlobWriter, WrittenVersion};
