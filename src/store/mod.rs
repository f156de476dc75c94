// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key-value store backends.
//!
//! - [`traits`]: the [`SourceStore`] boundary used by the archiver
//! - [`batch`]: atomic [`MetadataBatch`] of [`Mutation`]s
//! - [`redis`]: production backend
//! - [`memory`]: single-process backend with the same semantics

pub mod batch;
pub mod memory;
pub mod redis;
pub mod traits;

pub use batch::{MetadataBatch, Mutation};
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;
pub use traits::{KeyState, SourceStore, StorageError};
