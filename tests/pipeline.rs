// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! End-to-end pipeline tests against the in-memory backends.
//!
//! No Docker required: [`InMemoryStore`] mirrors the Redis semantics the
//! archiver relies on and [`InMemoryBlobStore`] records every write.
//!
//! Run with: `cargo test --test pipeline`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use redis_archiver::compression::decompress_bytes;
use redis_archiver::{
    ArchiveError, Archiver, ArchiverConfig, BlobError, BlobStore, ExitPolicy, ExitReason,
    Fingerprint, InMemoryBlobStore, InMemoryStore, ManualClock, Mode, Outcome, SourceStore,
};

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    store: Arc<InMemoryStore>,
    blobs: Arc<InMemoryBlobStore>,
    clock: Arc<ManualClock>,
    archiver: Archiver,
}

fn harness(config: ArchiverConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new(config.keyspace()));
    let blobs = Arc::new(InMemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let archiver = Archiver::new(&config, store.clone(), blobs.clone()).with_clock(clock.clone());
    Harness { store, blobs, clock, archiver }
}

fn with_outq() -> ArchiverConfig {
    ArchiverConfig {
        outq: Some("next:q".into()),
        ..Default::default()
    }
}

impl Harness {
    /// Queue `key`, move it in flight the way the loop does, then process it.
    async fn process(&self, key: &str) -> Result<Outcome, ArchiveError> {
        self.store.enqueue(key);
        let dequeued = self.store.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(dequeued.as_deref(), Some(key));
        self.archiver.process_key(key).await
    }

    fn blob_json(&self, path: &str) -> serde_json::Value {
        let raw = self.blobs.get(path).unwrap_or_else(|| panic!("missing blob {}", path));
        serde_json::from_slice(&decompress_bytes(&raw).unwrap()).unwrap()
    }

    fn in_flight(&self) -> Vec<String> {
        self.store.list("r8:busy:q")
    }
}

/// Blob backend that refuses every operation.
struct BrokenBlobs;

#[async_trait]
impl BlobStore for BrokenBlobs {
    async fn write(&self, _path: &str, _data: &[u8]) -> Result<(), BlobError> {
        Err(BlobError::Backend("disk on fire".into()))
    }

    async fn remove(&self, _path: &str) -> Result<(), BlobError> {
        Err(BlobError::Backend("disk on fire".into()))
    }

    async fn read(&self, _path: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Err(BlobError::Backend("disk on fire".into()))
    }
}

// =============================================================================
// Lifecycle of one key
// =============================================================================

#[tokio::test]
async fn test_key_lifecycle_with_clock_skew() {
    let h = harness(with_outq());
    let f1 = Fingerprint::of(br#"{"v":1}"#);
    let f2 = Fingerprint::of(br#"{"v":2}"#);

    // First version at T1
    h.store.set("A", br#"{"v":1}"#.to_vec());
    let outcome = h.process("A").await.unwrap();
    assert_eq!(outcome.timestamp(), Some(1_000));
    assert_eq!(h.store.hget("r8:sha:h", "A").as_deref(), Some(f1.as_str()));
    assert_eq!(h.store.hget("r8:1:sha:h", "A").as_deref(), Some(f1.as_str()));
    assert_eq!(h.store.hget("r8:modtime:h", "A").as_deref(), Some("1000"));
    assert_eq!(h.blob_json("key/A.zst"), serde_json::json!({"v": 1}));
    assert!(h.blobs.get("time/A/0000000001000.zst").is_some());
    assert!(h.blobs.get(&format!("sha/{}.zst", f1)).is_some());
    assert!(h.in_flight().is_empty());

    // Unchanged at T2: nothing written, modtime untouched
    h.clock.set(2_000);
    let writes = h.blobs.write_count();
    assert_eq!(h.process("A").await.unwrap(), Outcome::Unchanged);
    assert_eq!(h.blobs.write_count(), writes);
    assert_eq!(h.store.hget("r8:modtime:h", "A").as_deref(), Some("1000"));
    assert!(h.in_flight().is_empty());

    // Deleted at T3
    h.clock.set(3_000);
    h.store.remove("A");
    let outcome = h.process("A").await.unwrap();
    assert_eq!(outcome, Outcome::Deleted { timestamp: 3_000, latest: "key/A.zst".into() });
    assert!(h.blobs.get("key/A.zst").is_none());
    assert!(h.store.sismember("r8:rem:s", "A"));
    assert!(h.store.sismember("r8:1:rem:s", "A"));
    assert_eq!(h.store.hget("r8:sha:h", "A"), None);
    assert_eq!(h.store.hget("r8:1:sha:h", "A"), None);

    // Rewritten at T4 behind the recorded modtime
    h.clock.set(2_500);
    h.store.set("A", br#"{"v":2}"#.to_vec());
    let outcome = h.process("A").await.unwrap();
    assert_eq!(outcome.timestamp(), Some(3_001));
    assert!(!h.store.sismember("r8:rem:s", "A"));
    assert!(!h.store.sismember("r8:1:rem:s", "A"));
    assert_eq!(h.store.hget("r8:sha:h", "A").as_deref(), Some(f2.as_str()));
    assert_eq!(h.store.hget("r8:modtime:h", "A").as_deref(), Some("3001"));
    assert_eq!(h.blob_json("key/A.zst"), serde_json::json!({"v": 2}));
    assert_eq!(h.blob_json("time/A/0000000003001.zst"), serde_json::json!({"v": 2}));
    assert!(h.blobs.get(&format!("sha/{}.zst", f2)).is_some());

    // History holds every event in order
    assert_eq!(
        h.store.zrange("r8:1:key:A:z"),
        vec![
            (1_000, f1.to_string()),
            (3_000, "3000".to_string()),
            (3_001, f2.to_string()),
        ]
    );

    // Changed, deleted and changed again were all forwarded; unchanged was not
    assert_eq!(h.store.list("next:q"), vec!["A", "A", "A"]);
    assert!(h.in_flight().is_empty());
}

#[tokio::test]
async fn test_returning_content_moves_its_history_entry() {
    let h = harness(ArchiverConfig::default());
    let a = Fingerprint::of(br#"{"v":"a"}"#);
    let b = Fingerprint::of(br#"{"v":"b"}"#);

    for (at, body) in [(1_000, r#"{"v":"a"}"#), (2_000, r#"{"v":"b"}"#), (3_000, r#"{"v":"a"}"#)] {
        h.clock.set(at);
        h.store.set("doc", body.as_bytes().to_vec());
        h.process("doc").await.unwrap();
    }

    assert_eq!(
        h.store.zrange("r8:1:key:doc:z"),
        vec![(2_000, b.to_string()), (3_000, a.to_string())]
    );
    // Every version still has its own history blob
    for ts in ["0000000001000", "0000000002000", "0000000003000"] {
        assert!(h.blobs.get(&format!("time/doc/{}.zst", ts)).is_some());
    }
}

#[tokio::test]
async fn test_deletion_keeps_history_and_dedup_blobs() {
    let h = harness(with_outq());
    let sha = Fingerprint::of(br#"{"keep":true}"#);

    h.store.set("doc", br#"{"keep":true}"#.to_vec());
    h.process("doc").await.unwrap();
    h.store.remove("doc");
    h.clock.advance(10);
    h.process("doc").await.unwrap();

    assert_eq!(
        h.blobs.paths(),
        vec![format!("sha/{}.zst", sha), "time/doc/0000000001000.zst".to_string()]
    );
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_timestamps_strictly_increase_with_frozen_clock() {
    let h = harness(ArchiverConfig::default());
    let mut last = i64::MIN;

    for i in 0..5 {
        h.store.set("k", format!(r#"{{"i":{}}}"#, i).into_bytes());
        let ts = h.process("k").await.unwrap().timestamp().unwrap();
        assert!(ts > last, "timestamp {} did not advance past {}", ts, last);
        last = ts;
    }
    assert_eq!(last, 1_004);
    assert_eq!(h.store.zrange("r8:1:key:k:z").len(), 5);
}

#[tokio::test]
async fn test_timestamps_advance_when_clock_runs_backwards() {
    let h = harness(ArchiverConfig::default());
    h.clock.set(10_000);
    h.store.set("k", br#"{"n":1}"#.to_vec());
    h.process("k").await.unwrap();

    h.clock.set(5);
    h.store.set("k", br#"{"n":2}"#.to_vec());
    assert_eq!(h.process("k").await.unwrap().timestamp(), Some(10_001));
}

#[tokio::test]
async fn test_identical_content_shares_dedup_blob() {
    let h = harness(ArchiverConfig {
        expire: Some(60),
        ..Default::default()
    });
    let body = br#"{"same":"content"}"#;
    h.store.set("left", body.to_vec());
    h.store.set("right", body.to_vec());

    let Outcome::Changed { paths: left, .. } = h.process("left").await.unwrap() else {
        panic!("expected a new version");
    };
    let Outcome::Changed { paths: right, .. } = h.process("right").await.unwrap() else {
        panic!("expected a new version");
    };

    assert_eq!(left.dedup, right.dedup);
    assert_ne!(left.latest, right.latest);
    assert_ne!(left.history, right.history);
    // 2 latest + 2 history + 1 shared dedup
    assert_eq!(h.blobs.len(), 5);

    // Expire policy leaves the source keys in place with a TTL
    assert_eq!(h.store.ttl("left"), Some(60));
    assert_eq!(h.store.ttl("right"), Some(60));
    assert!(h.store.get("left").is_some());
}

#[tokio::test]
async fn test_unchanged_content_mutates_nothing_but_the_ack() {
    let h = harness(with_outq());
    h.store.set("doc", br#"{"a":1}"#.to_vec());
    h.process("doc").await.unwrap();

    let writes = h.blobs.write_count();
    let history = h.store.zrange("r8:1:key:doc:z");
    let sha = h.store.hget("r8:sha:h", "doc");

    for _ in 0..3 {
        h.clock.advance(1_000);
        assert_eq!(h.process("doc").await.unwrap(), Outcome::Unchanged);
    }

    assert_eq!(h.blobs.write_count(), writes);
    assert_eq!(h.store.zrange("r8:1:key:doc:z"), history);
    assert_eq!(h.store.hget("r8:sha:h", "doc"), sha);
    assert_eq!(h.store.list("next:q"), vec!["doc"]);
    assert!(h.in_flight().is_empty());
}

#[tokio::test]
async fn test_default_policy_deletes_source_key() {
    let h = harness(ArchiverConfig::default());
    h.store.set("doc", br#"[1,2,3]"#.to_vec());
    h.process("doc").await.unwrap();
    assert_eq!(h.store.get("doc"), None);
    assert!(h.store.list("next:q").is_empty());
}

#[tokio::test]
async fn test_delete_of_never_seen_key_records_tombstone() {
    let h = harness(ArchiverConfig::default());
    let outcome = h.process("ghost").await.unwrap();

    assert!(matches!(outcome, Outcome::Deleted { timestamp: 1_000, .. }));
    assert!(h.store.sismember("r8:rem:s", "ghost"));
    assert_eq!(h.blobs.remove_count(), 1);
    assert!(h.blobs.is_empty());
}

#[tokio::test]
async fn test_minimal_mode_skips_history_entries() {
    let h = harness(ArchiverConfig {
        mode: Mode::Minimal,
        outq: Some("next:q".into()),
        ..Default::default()
    });
    h.store.set("doc", br#"{"m":1}"#.to_vec());
    h.process("doc").await.unwrap();
    h.store.remove("doc");
    h.clock.advance(1);
    h.process("doc").await.unwrap();

    assert!(h.store.zrange("r8:1:key:doc:z").is_empty());
    assert!(h.store.sismember("r8:1:rem:s", "doc"));
    assert_eq!(h.store.hget("r8:modtime:h", "doc").as_deref(), Some("1001"));
    // Blob triple is still written
    assert_eq!(h.blobs.write_count(), 3);
}

#[tokio::test]
async fn test_generations_keep_separate_history_and_tombstones() {
    let first = with_outq();
    let second = ArchiverConfig {
        snapshot_id: "2".into(),
        ..with_outq()
    };
    let store = Arc::new(InMemoryStore::new(first.keyspace()));
    let blobs = Arc::new(InMemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let gen1 = Archiver::new(&first, store.clone(), blobs.clone()).with_clock(clock.clone());
    let gen2 = Archiver::new(&second, store.clone(), blobs.clone()).with_clock(clock.clone());

    let dequeue = |key: &'static str| {
        let store = store.clone();
        async move {
            store.enqueue(key);
            store.dequeue(Duration::from_secs(1)).await.unwrap()
        }
    };
    let f1 = Fingerprint::of(br#"{"v":1}"#);
    let f2 = Fingerprint::of(br#"{"v":2}"#);

    store.set("doc", br#"{"v":1}"#.to_vec());
    dequeue("doc").await;
    gen1.process_key("doc").await.unwrap();

    clock.set(2_000);
    store.set("doc", br#"{"v":2}"#.to_vec());
    dequeue("doc").await;
    gen2.process_key("doc").await.unwrap();

    clock.set(3_000);
    store.remove("doc");
    dequeue("doc").await;
    gen2.process_key("doc").await.unwrap();

    // Per-generation state
    assert_eq!(store.zrange("r8:1:key:doc:z"), vec![(1_000, f1.to_string())]);
    assert_eq!(
        store.zrange("r8:2:key:doc:z"),
        vec![(2_000, f2.to_string()), (3_000, "3000".to_string())]
    );
    assert_eq!(store.hget("r8:1:sha:h", "doc").as_deref(), Some(f1.as_str()));
    assert_eq!(store.hget("r8:2:sha:h", "doc"), None);
    assert!(!store.sismember("r8:1:rem:s", "doc"));
    assert!(store.sismember("r8:2:rem:s", "doc"));

    // Shared state follows the latest event from any generation
    assert!(store.sismember("r8:rem:s", "doc"));
    assert_eq!(store.hget("r8:sha:h", "doc"), None);
    assert_eq!(store.hget("r8:modtime:h", "doc").as_deref(), Some("3000"));
    assert!(store.list("r8:busy:q").is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_invalid_json_is_a_data_error_and_stays_in_flight() {
    let h = harness(ArchiverConfig::default());
    h.store.set("bad", b"not json".to_vec());

    let err = h.process("bad").await.unwrap_err();
    assert!(err.is_data_error());
    assert_eq!(err.payload(), Some("not json"));
    assert_eq!(h.in_flight(), vec!["bad"]);
    assert!(h.blobs.is_empty());
    assert_eq!(h.store.hget("r8:sha:h", "bad"), None);
    assert_eq!(h.store.hget("r8:modtime:h", "bad"), None);
}

#[tokio::test]
async fn test_malformed_modtime_is_a_data_error() {
    let h = harness(ArchiverConfig::default());
    h.store.set("doc", br#"{}"#.to_vec());
    h.store.hset("r8:modtime:h", "doc", "yesterday");

    let err = h.process("doc").await.unwrap_err();
    assert!(err.is_data_error());
    assert_eq!(h.in_flight(), vec!["doc"]);
}

#[tokio::test]
async fn test_empty_key_is_rejected() {
    let h = harness(ArchiverConfig::default());
    let err = h.archiver.process_key("").await.unwrap_err();
    assert!(err.is_data_error());
}

#[tokio::test]
async fn test_blob_failure_leaves_no_metadata() {
    let config = ArchiverConfig::default();
    let store = Arc::new(InMemoryStore::new(config.keyspace()));
    let archiver = Archiver::new(&config, store.clone(), Arc::new(BrokenBlobs));

    store.set("doc", br#"{"x":1}"#.to_vec());
    store.enqueue("doc");
    store.dequeue(Duration::from_secs(1)).await.unwrap();

    let err = archiver.process_key("doc").await.unwrap_err();
    assert!(!err.is_data_error());
    assert!(matches!(err, ArchiveError::Blob(_)));
    assert_eq!(store.hget("r8:modtime:h", "doc"), None);
    assert_eq!(store.hget("r8:sha:h", "doc"), None);
    assert_eq!(store.list("r8:busy:q"), vec!["doc"]);
    assert!(store.get("doc").is_some());
}

// =============================================================================
// Dispatch loop
// =============================================================================

#[tokio::test]
async fn test_run_continues_past_bad_keys_until_queue_empty() {
    let h = harness(ArchiverConfig {
        exit: ExitPolicy::Empty,
        ..Default::default()
    });
    h.store.set("bad", b"{broken".to_vec());
    h.store.set("good", br#"{"ok":true}"#.to_vec());
    h.store.enqueue("bad");
    h.store.enqueue("good");

    let summary = h.archiver.run().await;
    assert_eq!(summary.exit, ExitReason::QueueEmpty);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.changed, 1);
    assert_eq!(summary.stats.processed(), 2);
    assert_eq!(h.in_flight(), vec!["bad"]);
    assert!(h.blobs.get("key/good.zst").is_some());
}

#[tokio::test]
async fn test_run_stops_on_sentinel_and_acknowledges_it() {
    let h = harness(ArchiverConfig::default());
    h.store.set("a", br#"{"n":1}"#.to_vec());
    h.store.enqueue("a");
    h.store.signal_shutdown();
    h.store.enqueue("after");

    let summary = h.archiver.run().await;
    assert_eq!(summary.exit, ExitReason::Sentinel);
    assert_eq!(summary.stats.changed, 1);
    assert!(h.in_flight().is_empty());
    // Keys behind the sentinel are left for the next worker
    assert_eq!(h.store.list("r8:q"), vec!["after"]);
}

#[tokio::test]
async fn test_run_waits_for_sentinel_from_another_task() {
    let h = harness(ArchiverConfig::default());
    h.store.set("a", br#"{"n":1}"#.to_vec());
    h.store.enqueue("a");

    let producer = h.store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        producer.signal_shutdown();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), h.archiver.run())
        .await
        .expect("run did not return after the sentinel was queued");
    assert_eq!(summary.exit, ExitReason::Sentinel);
    assert_eq!(summary.stats.changed, 1);
    assert!(h.in_flight().is_empty());
}

#[tokio::test]
async fn test_run_counts_every_outcome() {
    let h = harness(ArchiverConfig {
        exit: ExitPolicy::Empty,
        outq: Some("next:q".into()),
        ..Default::default()
    });
    h.store.set("same", br#"{"s":1}"#.to_vec());
    h.store.set("new", br#"{"s":2}"#.to_vec());
    h.process("same").await.unwrap();

    h.store.enqueue("same");
    h.store.enqueue("new");
    h.store.enqueue("gone");

    let summary = h.archiver.run().await;
    assert_eq!(summary.stats.unchanged, 1);
    assert_eq!(summary.stats.changed, 1);
    assert_eq!(summary.stats.deleted, 1);
    assert_eq!(summary.stats.failed, 0);
    assert!(h.in_flight().is_empty());
}
