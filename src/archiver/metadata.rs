// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metadata batches recorded after each key.
//!
//! | Outcome   | Batch |
//! |-----------|-------|
//! | changed   | modtime, fingerprint (global + generation), clear tombstone (global + generation), history `ts -> sha`, ack, completion policy |
//! | deleted   | modtime, drop fingerprint (global + generation), set tombstone (global + generation), history `ts -> ts`, ack, optional output push |
//! | unchanged | ack |
//!
//! History entries are skipped in [`Mode::Minimal`]. Each batch is applied
//! as one atomic unit, so readers never see e.g. a cleared tombstone
//! without the matching history entry.
//!
//! The history sorted set is not an append-only log. Its member for a
//! version is the fingerprint, so content that returns to an earlier value
//! (A, B, A) moves the existing A entry to the new timestamp instead of
//! adding one. The `time/` blobs still hold every version; only the index
//! collapses. Readers of the sorted set depend on this layout.

use crate::config::{CompletionPolicy, Mode};
use crate::fingerprint::Fingerprint;
use crate::keyspace::KeySpace;
use crate::store::MetadataBatch;

#[derive(Debug, Clone)]
pub struct MetadataUpdater {
    keys: KeySpace,
    mode: Mode,
    completion: CompletionPolicy,
}

impl MetadataUpdater {
    pub fn new(keys: KeySpace, mode: Mode, completion: CompletionPolicy) -> Self {
        Self { keys, mode, completion }
    }

    /// Batch for a newly archived version.
    #[must_use]
    pub fn changed(&self, key: &str, timestamp: i64, sha: &Fingerprint) -> MetadataBatch {
        let ks = &self.keys;
        let mut batch = MetadataBatch::new();
        batch
            .hset(ks.modtime_hash(), key, timestamp.to_string())
            .hset(ks.sha_hash(), key, sha.as_str())
            .hset(ks.snapshot_sha_hash(), key, sha.as_str())
            .srem(ks.removed_set(), key)
            .srem(ks.snapshot_removed_set(), key);
        if self.mode == Mode::Snapshot {
            batch.zadd(ks.history_zset(key), timestamp, sha.as_str());
        }
        batch.lrem(ks.busy_queue(), key);

        match &self.completion {
            CompletionPolicy::OutputQueue(list) => batch.lpush(list.as_str(), key),
            CompletionPolicy::Expire(seconds) => batch.expire(key, *seconds),
            CompletionPolicy::DeleteSource => batch.del(key),
        };
        batch
    }

    /// Batch for a key whose source value is gone.
    #[must_use]
    pub fn deleted(&self, key: &str, timestamp: i64) -> MetadataBatch {
        let ks = &self.keys;
        let mut batch = MetadataBatch::new();
        batch
            .hset(ks.modtime_hash(), key, timestamp.to_string())
            .hdel(ks.sha_hash(), key)
            .hdel(ks.snapshot_sha_hash(), key)
            .sadd(ks.removed_set(), key)
            .sadd(ks.snapshot_removed_set(), key);
        if self.mode == Mode::Snapshot {
            batch.zadd(ks.history_zset(key), timestamp, timestamp.to_string());
        }
        batch.lrem(ks.busy_queue(), key);

        if let Some(list) = self.completion.output_queue() {
            batch.lpush(list, key);
        }
        batch
    }

    /// Batch that only acknowledges `key`.
    #[must_use]
    pub fn acknowledge(&self, key: &str) -> MetadataBatch {
        let mut batch = MetadataBatch::new();
        batch.lrem(self.keys.busy_queue(), key);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Mutation;

    fn updater(mode: Mode, completion: CompletionPolicy) -> MetadataUpdater {
        MetadataUpdater::new(KeySpace::new("r8", "1"), mode, completion)
    }

    fn sha() -> Fingerprint {
        Fingerprint::of(br#"{"v":1}"#)
    }

    #[test]
    fn test_changed_batch_snapshot_mode() {
        let u = updater(Mode::Snapshot, CompletionPolicy::DeleteSource);
        let sha = sha();
        let batch = u.changed("doc", 1_000, &sha);

        assert_eq!(
            batch.mutations(),
            &[
                Mutation::HSet { hash: "r8:modtime:h".into(), field: "doc".into(), value: "1000".into() },
                Mutation::HSet { hash: "r8:sha:h".into(), field: "doc".into(), value: sha.to_string() },
                Mutation::HSet { hash: "r8:1:sha:h".into(), field: "doc".into(), value: sha.to_string() },
                Mutation::SRem { set: "r8:rem:s".into(), member: "doc".into() },
                Mutation::SRem { set: "r8:1:rem:s".into(), member: "doc".into() },
                Mutation::ZAdd { zset: "r8:1:key:doc:z".into(), score: 1_000, member: sha.to_string() },
                Mutation::LRem { list: "r8:busy:q".into(), value: "doc".into() },
                Mutation::Del { key: "doc".into() },
            ]
        );
    }

    #[test]
    fn test_changed_completion_variants() {
        let sha = sha();

        let out = updater(Mode::Snapshot, CompletionPolicy::OutputQueue("next:q".into()))
            .changed("doc", 1, &sha);
        assert_eq!(out.mutations().last(), Some(&Mutation::LPush { list: "next:q".into(), value: "doc".into() }));

        let exp = updater(Mode::Snapshot, CompletionPolicy::Expire(60)).changed("doc", 1, &sha);
        assert_eq!(exp.mutations().last(), Some(&Mutation::Expire { key: "doc".into(), seconds: 60 }));

        // Exactly one completion action
        for batch in [&out, &exp] {
            let actions = batch
                .mutations()
                .iter()
                .filter(|m| matches!(m, Mutation::LPush { .. } | Mutation::Expire { .. } | Mutation::Del { .. }))
                .count();
            assert_eq!(actions, 1);
        }
    }

    #[test]
    fn test_minimal_mode_skips_history() {
        let u = updater(Mode::Minimal, CompletionPolicy::DeleteSource);
        let changed = u.changed("doc", 5, &sha());
        let deleted = u.deleted("doc", 6);

        for batch in [&changed, &deleted] {
            assert!(!batch.mutations().iter().any(|m| matches!(m, Mutation::ZAdd { .. })));
            assert!(batch.mutations().contains(&Mutation::LRem { list: "r8:busy:q".into(), value: "doc".into() }));
        }
        assert!(changed.mutations().contains(&Mutation::SRem { set: "r8:1:rem:s".into(), member: "doc".into() }));
        assert!(deleted.mutations().contains(&Mutation::SAdd { set: "r8:1:rem:s".into(), member: "doc".into() }));
    }

    #[test]
    fn test_deleted_batch() {
        let u = updater(Mode::Snapshot, CompletionPolicy::Expire(60));
        let batch = u.deleted("doc", 2_000);

        assert_eq!(
            batch.mutations(),
            &[
                Mutation::HSet { hash: "r8:modtime:h".into(), field: "doc".into(), value: "2000".into() },
                Mutation::HDel { hash: "r8:sha:h".into(), field: "doc".into() },
                Mutation::HDel { hash: "r8:1:sha:h".into(), field: "doc".into() },
                Mutation::SAdd { set: "r8:rem:s".into(), member: "doc".into() },
                Mutation::SAdd { set: "r8:1:rem:s".into(), member: "doc".into() },
                Mutation::ZAdd { zset: "r8:1:key:doc:z".into(), score: 2_000, member: "2000".into() },
                Mutation::LRem { list: "r8:busy:q".into(), value: "doc".into() },
            ]
        );
    }

    #[test]
    fn test_deleted_pushes_to_output_queue() {
        let u = updater(Mode::Snapshot, CompletionPolicy::OutputQueue("next:q".into()));
        let batch = u.deleted("doc", 1);
        assert_eq!(batch.mutations().last(), Some(&Mutation::LPush { list: "next:q".into(), value: "doc".into() }));
        assert!(!batch.mutations().iter().any(|m| matches!(m, Mutation::Del { .. } | Mutation::Expire { .. })));
    }

    #[test]
    fn test_acknowledge_only_removes_from_busy() {
        let u = updater(Mode::Snapshot, CompletionPolicy::DeleteSource);
        let batch = u.acknowledge("doc");
        assert_eq!(batch.mutations(), &[Mutation::LRem { list: "r8:busy:q".into(), value: "doc".into() }]);
    }
}
