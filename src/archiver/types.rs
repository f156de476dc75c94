// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public result types for the archiver.

use crate::fingerprint::Fingerprint;
use crate::path_format::BlobPaths;

/// What happened to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new version was written to all three blob paths.
    Changed {
        timestamp: i64,
        sha: Fingerprint,
        paths: BlobPaths,
    },
    /// Content matched the recorded fingerprint; only acknowledged.
    Unchanged,
    /// The source key was gone; latest blob removed, tombstone recorded.
    Deleted { timestamp: i64, latest: String },
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Changed { .. } => "changed",
            Self::Unchanged => "unchanged",
            Self::Deleted { .. } => "deleted",
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Changed { timestamp, .. } | Self::Deleted { timestamp, .. } => Some(*timestamp),
            Self::Unchanged => None,
        }
    }
}

/// Why the dispatch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The queue drained and the exit policy is `empty`.
    QueueEmpty,
    /// The sentinel key was dequeued.
    Sentinel,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueEmpty => write!(f, "QueueEmpty"),
            Self::Sentinel => write!(f, "Sentinel"),
        }
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub changed: u64,
    pub unchanged: u64,
    pub deleted: u64,
    /// Keys abandoned in the in-flight list.
    pub failed: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Changed { .. } => self.changed += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Deleted { .. } => self.deleted += 1,
        }
    }

    /// Keys taken off the queue, successful or not.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.changed + self.unchanged + self.deleted + self.failed
    }
}

/// Returned by [`Archiver::run`](super::Archiver::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: ExitReason,
    pub stats: RunStats,
}
