// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store-agnostic mutation batches.
//!
//! The metadata updater describes its writes as a list of [`Mutation`]s;
//! each [`SourceStore`](super::SourceStore) applies the whole list
//! atomically (MULTI/EXEC for Redis, one lock for the in-memory store).

/// One key-value store write. Names follow the Redis command they map to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    HSet { hash: String, field: String, value: String },
    HDel { hash: String, field: String },
    SAdd { set: String, member: String },
    SRem { set: String, member: String },
    ZAdd { zset: String, score: i64, member: String },
    /// Remove the first occurrence of `value` (LREM list 1 value).
    LRem { list: String, value: String },
    LPush { list: String, value: String },
    Expire { key: String, seconds: u64 },
    Del { key: String },
}

/// An ordered set of mutations that must be applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBatch {
    mutations: Vec<Mutation>,
}

impl MetadataBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hset(&mut self, hash: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Mutation::HSet { hash: hash.into(), field: field.into(), value: value.into() })
    }

    pub fn hdel(&mut self, hash: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.push(Mutation::HDel { hash: hash.into(), field: field.into() })
    }

    pub fn sadd(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.push(Mutation::SAdd { set: set.into(), member: member.into() })
    }

    pub fn srem(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.push(Mutation::SRem { set: set.into(), member: member.into() })
    }

    pub fn zadd(&mut self, zset: impl Into<String>, score: i64, member: impl Into<String>) -> &mut Self {
        self.push(Mutation::ZAdd { zset: zset.into(), score, member: member.into() })
    }

    pub fn lrem(&mut self, list: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Mutation::LRem { list: list.into(), value: value.into() })
    }

    pub fn lpush(&mut self, list: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Mutation::LPush { list: list.into(), value: value.into() })
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: u64) -> &mut Self {
        self.push(Mutation::Expire { key: key.into(), seconds })
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Mutation::Del { key: key.into() })
    }

    fn push(&mut self, m: Mutation) -> &mut Self {
        self.mutations.push(m);
        self
    }

    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl<'a> IntoIterator for &'a MetadataBatch {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}
