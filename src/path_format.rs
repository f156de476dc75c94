// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Blob path layout.
//!
//! Each archived version is stored three times under disjoint prefixes:
//!
//! ```text
//! key/{key}.zst                  latest copy, overwritten per version
//! time/{key}/{timestamp}.zst     one per version, never overwritten
//! sha/{fingerprint}.zst          one per distinct content, shared
//! ```
//!
//! Keys are percent-encoded so that any Redis key maps to a single path
//! component; timestamps are zero-padded so history sorts lexically.

use crate::fingerprint::Fingerprint;

const EXTENSION: &str = "zst";

/// Encode a key as one path component.
///
/// Percent-encodes everything outside `[A-Za-z0-9._~-]` (uppercase hex).
/// A leading dot is also encoded so `.` and `..` can never be produced.
/// The mapping is injective, so distinct keys never share a path.
#[must_use]
pub fn encode_key(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded.into_owned(),
    }
}

/// Location of the current value of `key`.
#[must_use]
pub fn latest_path(key: &str) -> String {
    format!("key/{}.{}", encode_key(key), EXTENSION)
}

/// Location of the version of `key` archived at `timestamp` (epoch ms).
#[must_use]
pub fn history_path(key: &str, timestamp: i64) -> String {
    format!("time/{}/{:013}.{}", encode_key(key), timestamp, EXTENSION)
}

/// Location shared by every version whose content hashes to `sha`.
#[must_use]
pub fn dedup_path(sha: &Fingerprint) -> String {
    format!("sha/{}.{}", sha, EXTENSION)
}

/// The three paths for one archived version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPaths {
    pub latest: String,
    pub history: String,
    pub dedup: String,
}

impl BlobPaths {
    #[must_use]
    pub fn new(key: &str, timestamp: i64, sha: &Fingerprint) -> Self {
        Self {
            latest: latest_path(key),
            history: history_path(key, timestamp),
            dedup: dedup_path(sha),
        }
    }
}
