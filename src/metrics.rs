// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the archiver.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `redis_archiver_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `outcome`: changed, unchanged, deleted
//! - `kind`: data, backend
//! - `stage`: content, store, blob, dequeue

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record a key that made it through the pipeline
pub fn record_key(outcome: &str) {
    counter!(
        "redis_archiver_keys_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an abandoned key
pub fn record_error(kind: &str, stage: &str) {
    counter!(
        "redis_archiver_errors_total",
        "kind" => kind.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Record compressed bytes handed to the blob backend
pub fn record_blob_bytes(bytes: usize) {
    counter!("redis_archiver_blob_bytes_total").increment(bytes as u64);
}

/// Record a dequeue that timed out with nothing pending
pub fn record_idle_poll() {
    counter!("redis_archiver_idle_polls_total").increment(1);
}

/// Record time spent on one key
pub fn record_key_latency(duration: Duration) {
    histogram!("redis_archiver_key_seconds").record(duration.as_secs_f64());
}

/// A timing guard that records per-key latency on drop
pub struct KeyTimer {
    start: Instant,
}

impl KeyTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for KeyTimer {
    fn drop(&mut self) {
        record_key_latency(self.start.elapsed());
    }
}
