// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Content fingerprints and change detection.
//!
//! A fingerprint is the SHA-256 of the raw content bytes rendered as
//! URL-safe base64 without padding. The alphabet is `[A-Za-z0-9_-]`, so
//! it can be used directly as a path component and as a Redis hash value.
//!
//! Two contents are treated as identical iff their fingerprints match.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Rendered length of a fingerprint (32 digest bytes, unpadded base64).
pub const FINGERPRINT_LEN: usize = 43;

/// Path-safe content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint raw content bytes.
    #[must_use]
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a key's content moved since it was last archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Content matches the recorded fingerprint.
    Unchanged,
    /// New or different content.
    Changed(Fingerprint),
    /// The source key no longer has a value.
    Deleted,
}

/// Classify a key given its current content and the previously recorded
/// fingerprint (compared as the recorded string, so values written by
/// other tooling still short-circuit when identical).
#[must_use]
pub fn classify(content: Option<&[u8]>, previous: Option<&str>) -> Transition {
    match content {
        None => Transition::Deleted,
        Some(bytes) => {
            let sha = Fingerprint::of(bytes);
            if previous == Some(sha.as_str()) {
                Transition::Unchanged
            } else {
                Transition::Changed(sha)
            }
        }
    }
}
