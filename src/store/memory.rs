// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory [`SourceStore`] with Redis-like semantics.
//!
//! All state sits behind one mutex, so a batch is applied atomically with
//! respect to every other call. Dequeue on an empty pending list parks until
//! [`InMemoryStore::enqueue`] wakes it or the timeout elapses, like
//! `BRPOPLPUSH`.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::batch::{MetadataBatch, Mutation};
use super::traits::{parse_modtime, KeyState, SourceStore, StorageError};
use crate::keyspace::{KeySpace, SENTINEL_KEY};

#[derive(Default)]
struct State {
    strings: HashMap<String, Vec<u8>>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    /// Kept sorted by (score, member), like a Redis sorted set.
    zsets: HashMap<String, Vec<(i64, String)>>,
    /// Front is the head (LPUSH side).
    lists: HashMap<String, VecDeque<String>>,
    expiries: HashMap<String, u64>,
}

impl State {
    fn apply(&mut self, m: &Mutation) {
        match m {
            Mutation::HSet { hash, field, value } => {
                self.hashes.entry(hash.clone()).or_default().insert(field.clone(), value.clone());
            }
            Mutation::HDel { hash, field } => {
                if let Some(h) = self.hashes.get_mut(hash) {
                    h.remove(field);
                }
            }
            Mutation::SAdd { set, member } => {
                self.sets.entry(set.clone()).or_default().insert(member.clone());
            }
            Mutation::SRem { set, member } => {
                if let Some(s) = self.sets.get_mut(set) {
                    s.remove(member);
                }
            }
            Mutation::ZAdd { zset, score, member } => {
                let entries = self.zsets.entry(zset.clone()).or_default();
                entries.retain(|(_, m)| m != member);
                entries.push((*score, member.clone()));
                entries.sort();
            }
            Mutation::LRem { list, value } => {
                if let Some(l) = self.lists.get_mut(list) {
                    if let Some(pos) = l.iter().position(|v| v == value) {
                        l.remove(pos);
                    }
                }
            }
            Mutation::LPush { list, value } => {
                self.lists.entry(list.clone()).or_default().push_front(value.clone());
            }
            Mutation::Expire { key, seconds } => {
                if self.exists(key) {
                    self.expiries.insert(key.clone(), *seconds);
                }
            }
            Mutation::Del { key } => {
                self.strings.remove(key);
                self.hashes.remove(key);
                self.sets.remove(key);
                self.zsets.remove(key);
                self.lists.remove(key);
                self.expiries.remove(key);
            }
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.strings.contains_key(key)
            || self.hashes.contains_key(key)
            || self.sets.contains_key(key)
            || self.zsets.contains_key(key)
            || self.lists.contains_key(key)
    }
}

pub struct InMemoryStore {
    keys: KeySpace,
    state: Mutex<State>,
    pushed: Notify,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(keys: KeySpace) -> Self {
        Self {
            keys,
            state: Mutex::new(State::default()),
            pushed: Notify::new(),
        }
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keys
    }

    /// Write a source document (SET).
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>) {
        let mut state = self.state.lock();
        state.strings.insert(key.to_string(), value.into());
        state.expiries.remove(key);
    }

    /// Delete a source document (DEL).
    pub fn remove(&self, key: &str) {
        self.state.lock().apply(&Mutation::Del { key: key.to_string() });
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().strings.get(key).cloned()
    }

    /// Push `key` onto the pending list, as a producer would.
    pub fn enqueue(&self, key: &str) {
        let list = self.keys.pending_queue();
        self.state.lock().apply(&Mutation::LPush { list, value: key.to_string() });
        self.pushed.notify_one();
    }

    fn pop_pending(&self) -> Option<String> {
        let pending = self.keys.pending_queue();
        let busy = self.keys.busy_queue();
        let mut state = self.state.lock();

        let key = state.lists.get_mut(&pending).and_then(VecDeque::pop_back)?;
        state.apply(&Mutation::LPush { list: busy, value: key.clone() });
        Some(key)
    }

    /// Ask the worker to stop.
    pub fn signal_shutdown(&self) {
        self.enqueue(SENTINEL_KEY);
    }

    pub fn hset(&self, hash: &str, field: &str, value: &str) {
        self.state.lock().apply(&Mutation::HSet {
            hash: hash.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    #[must_use]
    pub fn hget(&self, hash: &str, field: &str) -> Option<String> {
        self.state.lock().hashes.get(hash).and_then(|h| h.get(field).cloned())
    }

    #[must_use]
    pub fn sismember(&self, set: &str, member: &str) -> bool {
        self.state.lock().sets.get(set).is_some_and(|s| s.contains(member))
    }

    /// Sorted-set entries in score order.
    #[must_use]
    pub fn zrange(&self, zset: &str) -> Vec<(i64, String)> {
        self.state.lock().zsets.get(zset).cloned().unwrap_or_default()
    }

    /// List contents from head to tail.
    #[must_use]
    pub fn list(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .lists
            .get(name)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Expiry set on `key`, in seconds.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.state.lock().expiries.get(key).copied()
    }
}

#[async_trait]
impl SourceStore for InMemoryStore {
    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StorageError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register before checking so a push in between is not missed
            let pushed = self.pushed.notified();
            if let Some(key) = self.pop_pending() {
                return Ok(Some(key));
            }
            if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                return Ok(self.pop_pending());
            }
        }
    }

    async fn fetch(&self, key: &str) -> Result<KeyState, StorageError> {
        let modtime_hash = self.keys.modtime_hash();
        let (content, modtime, sha) = {
            let state = self.state.lock();
            (
                state.strings.get(key).cloned(),
                state.hashes.get(&modtime_hash).and_then(|h| h.get(key).cloned()),
                state.hashes.get(&self.keys.sha_hash()).and_then(|h| h.get(key).cloned()),
            )
        };
        Ok(KeyState {
            content,
            modtime: parse_modtime(&modtime_hash, key, modtime)?,
            sha,
        })
    }

    async fn apply(&self, batch: &MetadataBatch) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        for m in batch {
            state.apply(m);
        }
        Ok(())
    }
}
