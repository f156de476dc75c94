// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The dispatch loop.

use tracing::{error, info, warn};

use super::types::{ExitReason, RunStats, RunSummary};
use super::{ArchiveError, Archiver};
use crate::config::ExitPolicy;
use crate::keyspace::SENTINEL_KEY;
use crate::metrics::KeyTimer;

impl Archiver {
    /// Drain the queue until the exit policy or the sentinel stops us.
    ///
    /// Never fails: a key that errors is logged and left in the in-flight
    /// list, and a failed dequeue is retried after one poll interval.
    pub async fn run(&self) -> RunSummary {
        info!(
            namespace = %self.keys.namespace(),
            snapshot = %self.keys.snapshot_id(),
            mode = ?self.mode,
            exit = ?self.exit,
            "Archiver started"
        );
        let mut stats = RunStats::default();

        let exit = loop {
            let key = match self.store.dequeue(self.pop_timeout).await {
                Ok(key) => key,
                Err(e) => {
                    error!(error = %e, "Dequeue failed");
                    crate::metrics::record_error("backend", "dequeue");
                    tokio::time::sleep(self.pop_timeout).await;
                    continue;
                }
            };

            let key = match key {
                None => {
                    crate::metrics::record_idle_poll();
                    if self.exit == ExitPolicy::Empty {
                        break ExitReason::QueueEmpty;
                    }
                    continue;
                }
                Some(key) if key == SENTINEL_KEY => {
                    self.acknowledge_sentinel().await;
                    break ExitReason::Sentinel;
                }
                Some(key) => key,
            };

            let _timer = KeyTimer::start();
            match self.process_key(&key).await {
                Ok(outcome) => {
                    crate::metrics::record_key(outcome.as_str());
                    stats.record(&outcome);
                }
                Err(e) => {
                    stats.failed += 1;
                    report_failure(&key, &e);
                }
            }
        };

        info!(
            reason = %exit,
            changed = stats.changed,
            unchanged = stats.unchanged,
            deleted = stats.deleted,
            failed = stats.failed,
            "exit"
        );
        RunSummary { exit, stats }
    }

    /// The dequeue moved the sentinel into the in-flight list; take it out
    /// so a recovery sweep does not replay the shutdown.
    async fn acknowledge_sentinel(&self) {
        let batch = self.metadata.acknowledge(SENTINEL_KEY);
        if let Err(e) = self.store.apply(&batch).await {
            warn!(error = %e, "Failed to acknowledge shutdown sentinel");
        }
    }
}

fn report_failure(key: &str, e: &ArchiveError) {
    crate::metrics::record_error(e.kind(), e.stage());
    if e.is_data_error() {
        error!(key, error = %e, payload = e.payload().unwrap_or_default(), "Invalid data, key left in flight");
    } else {
        error!(key, error = %e, "Archiving failed, key left in flight");
    }
}
