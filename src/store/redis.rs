// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis implementation of [`SourceStore`].
//!
//! - Dequeue is `BRPOPLPUSH {ns}:q {ns}:busy:q <secs>`; the move is atomic
//!   and visible to every worker sharing the queue.
//! - Fetch reads the modtime, fingerprint and source value in one
//!   MULTI/EXEC so the three agree with each other.
//! - Metadata batches are applied as a single MULTI/EXEC pipeline.
//!
//! Only the initial connection is retried. Per-key operations fail fast and
//! leave the key in the in-flight list for external recovery.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{cmd, pipe, AsyncCommands, Client};
use tracing::instrument;

use super::batch::{MetadataBatch, Mutation};
use super::traits::{parse_modtime, KeyState, SourceStore, StorageError};
use crate::keyspace::{KeySpace, SENTINEL_KEY};
use crate::resilience::retry::{retry, RetryConfig};

pub struct RedisStore {
    connection: ConnectionManager,
    keys: KeySpace,
}

impl RedisStore {
    /// Connect, retrying with the startup preset so a bad address fails
    /// within a few seconds instead of hanging.
    pub async fn new(connection_string: &str, keys: KeySpace) -> Result<Self, StorageError> {
        let client = Client::open(connection_string)?;

        let connection = retry("redis_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await?;

        Ok(Self { connection, keys })
    }

    /// Get a clone of the connection manager
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keys
    }

    /// Push `key` onto the pending list, as a producer would.
    pub async fn enqueue(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        let _: () = conn.lpush(self.keys.pending_queue(), key).await?;
        Ok(())
    }

    /// Ask every worker on this queue to stop.
    pub async fn signal_shutdown(&self) -> Result<(), StorageError> {
        self.enqueue(SENTINEL_KEY).await
    }
}

/// Redis takes a signed TTL; a wrapped value would delete the key at once.
fn expiry_seconds(seconds: u64) -> Result<i64, StorageError> {
    i64::try_from(seconds)
        .map_err(|_| StorageError::Backend(format!("expiry of {} seconds is out of range", seconds)))
}

#[async_trait]
impl SourceStore for RedisStore {
    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection.clone();
        let key: Option<String> = cmd("BRPOPLPUSH")
            .arg(self.keys.pending_queue())
            .arg(self.keys.busy_queue())
            .arg(timeout.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(key)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, key: &str) -> Result<KeyState, StorageError> {
        let mut conn = self.connection.clone();
        let modtime_hash = self.keys.modtime_hash();

        let mut pipeline = pipe();
        pipeline
            .atomic()
            .hget(&modtime_hash, key)
            .hget(self.keys.sha_hash(), key)
            .get(key);
        let (modtime, sha, content): (Option<String>, Option<String>, Option<Vec<u8>>) =
            pipeline.query_async(&mut conn).await?;

        Ok(KeyState {
            content,
            modtime: parse_modtime(&modtime_hash, key, modtime)?,
            sha,
        })
    }

    #[instrument(skip(self, batch), fields(mutations = batch.len()))]
    async fn apply(&self, batch: &MetadataBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let mut pipeline = pipe();
        pipeline.atomic();

        for m in batch {
            match m {
                Mutation::HSet { hash, field, value } => {
                    pipeline.hset(hash, field, value);
                }
                Mutation::HDel { hash, field } => {
                    pipeline.hdel(hash, field);
                }
                Mutation::SAdd { set, member } => {
                    pipeline.sadd(set, member);
                }
                Mutation::SRem { set, member } => {
                    pipeline.srem(set, member);
                }
                Mutation::ZAdd { zset, score, member } => {
                    pipeline.zadd(zset, member, *score);
                }
                Mutation::LRem { list, value } => {
                    pipeline.lrem(list, 1, value);
                }
                Mutation::LPush { list, value } => {
                    pipeline.lpush(list, value);
                }
                Mutation::Expire { key, seconds } => {
                    pipeline.expire(key, expiry_seconds(*seconds)?);
                }
                Mutation::Del { key } => {
                    pipeline.del(key);
                }
            }
        }

        let _: () = pipeline.query_async(&mut conn).await?;
        Ok(())
    }
}
