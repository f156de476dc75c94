// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Redis Archiver
//!
//! A worker that drains a Redis work queue and archives every changed JSON
//! document to content-addressed, compressed blob storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Redis work queue                        │
//! │  • Producers LPUSH keys onto `ns:q`                        │
//! │  • BRPOPLPUSH moves each key into `ns:busy:q` (in flight)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Archiver                            │
//! │  • Fetch value, prior modtime and fingerprint atomically   │
//! │  • Fingerprint (SHA-256, base64url) and classify           │
//! │  • Assign timestamp = max(now, prior + 1)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (changed: write zstd blob triple)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Blob store                           │
//! │  • key/<k>.zst              latest version                 │
//! │  • time/<k>/<ts>.zst        immutable history              │
//! │  • sha/<fp>.zst             dedup by content               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  (one MULTI/EXEC metadata batch)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Redis metadata                          │
//! │  • modtime / fingerprint hashes, tombstone sets            │
//! │  • per-key history sorted set                              │
//! │  • acknowledgment + completion (outq / expire / delete)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use redis_archiver::{Archiver, ArchiverConfig, BlobStoreRegistry, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ArchiverConfig {
//!         outq: Some("indexer:q".into()),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let blobs = BlobStoreRegistry::with_defaults()
//!         .create(&config.blob_store_type, &config.blob_store)?;
//!     let store = RedisStore::new(&config.redis_url(), config.keyspace()).await?;
//!
//!     let summary = Archiver::new(&config, Arc::new(store), blobs).run().await;
//!     println!("{} keys processed, stopped: {}", summary.stats.processed(), summary.exit);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`archiver`]: The [`Archiver`] pipeline and dispatch loop
//! - [`store`]: Source/metadata stores (Redis, in-memory)
//! - [`blob`]: Blob backends (filesystem, in-memory) and the backend registry
//! - [`fingerprint`]: Content fingerprints and change classification
//! - [`clock`]: Monotonic timestamp assignment
//! - [`path_format`]: Blob path layout and key encoding
//! - [`resilience`]: Startup retry

pub mod archiver;
pub mod blob;
pub mod clock;
pub mod compression;
pub mod config;
pub mod fingerprint;
pub mod keyspace;
pub mod metrics;
pub mod path_format;
pub mod resilience;
pub mod store;

pub use archiver::{ArchiveError, Archiver, ExitReason, MetadataUpdater, Outcome, RunStats, RunSummary};
pub use blob::{BlobError, BlobStore, BlobStoreRegistry, BlobWriter, FsBlobStore, InMemoryBlobStore};
pub use clock::{assign_timestamp, Clock, ManualClock, SystemClock};
pub use config::{ArchiverConfig, BlobStoreOptions, CompletionPolicy, ConfigError, ExitPolicy, Mode};
pub use fingerprint::{classify, Fingerprint, Transition};
pub use keyspace::{KeySpace, SENTINEL_KEY};
pub use path_format::BlobPaths;
pub use resilience::retry::RetryConfig;
pub use store::{InMemoryStore, KeyState, MetadataBatch, Mutation, RedisStore, SourceStore, StorageError};
pub use metrics::KeyTimer;
