// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis key-space layout.
//!
//! Every bookkeeping key lives under a namespace prefix (default `r8`):
//!
//! ```text
//! {ns}:q                         pending list (producers LPUSH keys)
//! {ns}:busy:q                    in-flight list (BRPOPLPUSH target)
//! {ns}:modtime:h                 key -> last modtime (ms)
//! {ns}:sha:h                     key -> current fingerprint
//! {ns}:{snapshot}:sha:h          generation-scoped fingerprints
//! {ns}:rem:s                     tombstones
//! {ns}:{snapshot}:rem:s          generation-scoped tombstones
//! {ns}:{snapshot}:key:{key}:z    history, score = timestamp
//! ```
//!
//! These names are a wire contract shared with producers and recovery
//! tooling; do not change them.

/// Key that producers push to stop all workers.
pub const SENTINEL_KEY: &str = "none";

/// Builds namespaced Redis keys for one namespace and snapshot generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
    snapshot_id: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            snapshot_id: snapshot_id.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn pending_queue(&self) -> String {
        format!("{}:q", self.namespace)
    }

    pub fn busy_queue(&self) -> String {
        format!("{}:busy:q", self.namespace)
    }

    pub fn modtime_hash(&self) -> String {
        format!("{}:modtime:h", self.namespace)
    }

    pub fn sha_hash(&self) -> String {
        format!("{}:sha:h", self.namespace)
    }

    pub fn snapshot_sha_hash(&self) -> String {
        format!("{}:{}:sha:h", self.namespace, self.snapshot_id)
    }

    pub fn removed_set(&self) -> String {
        format!("{}:rem:s", self.namespace)
    }

    pub fn snapshot_removed_set(&self) -> String {
        format!("{}:{}:rem:s", self.namespace, self.snapshot_id)
    }

    /// Per-key, per-generation history sorted set.
    pub fn history_zset(&self, key: &str) -> String {
        format!("{}:{}:key:{}:z", self.namespace, self.snapshot_id, key)
    }
}
