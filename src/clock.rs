// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Wall clock and per-key timestamp assignment.
//!
//! Recorded modtimes for a key must be strictly increasing even when the
//! wall clock repeats a millisecond or steps backwards (NTP slew, a worker
//! on another host with skew). [`assign_timestamp`] bumps the sample past
//! the last recorded modtime when needed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// A clock that only moves when told to. Useful for replaying skew.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Pick the timestamp for a new version of a key.
///
/// Returns `now` unless a prior modtime exists that is not strictly
/// older, in which case the result is `prior + 1`.
#[must_use]
pub fn assign_timestamp(now: i64, prior_modtime: Option<i64>) -> i64 {
    match prior_modtime {
        Some(prior) => now.max(prior.saturating_add(1)),
        None => now,
    }
}
