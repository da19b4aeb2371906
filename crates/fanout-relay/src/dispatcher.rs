//! Broadcast dispatcher
//!
//! Writes one payload to every registered connection in a single pass under
//! the registry lock. A connection whose write fails is closed and removed
//! in the same pass; the remaining connections still receive the payload.

use crate::registry::Registry;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Connections the payload was written to
    pub delivered: usize,
    /// Connections that failed and were removed
    pub failed: usize,
}

/// Cumulative counters across all passes
#[derive(Debug, Default)]
pub struct DispatchStats {
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Completed broadcast passes
    pub broadcasts: u64,
    /// Successful per-connection writes
    pub deliveries: u64,
    /// Failed per-connection writes
    pub failures: u64,
}

impl DispatchStats {
    fn record(&self, report: &BroadcastReport) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.failures.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    /// Read the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Fans a payload out to every live connection
pub struct Dispatcher {
    registry: Arc<Registry>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            stats: DispatchStats::default(),
        }
    }

    /// Write `payload` to every registered connection
    ///
    /// Fire-and-forget: there is no retry and no delivery confirmation. The
    /// returned report is for observability only.
    pub async fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut members = self.registry.lock().await;

        for id in members.ids() {
            let Some(conn) = members.get_mut(id) else {
                continue;
            };

            match conn.send_text(payload).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(connection = %id, error = %err, "Write failed, dropping connection");
                    if let Some(mut conn) = members.remove(id) {
                        conn.close().await;
                    }
                    report.failed += 1;
                }
            }
        }
        let remaining = members.len();
        drop(members);

        self.stats.record(&report);
        debug!(
            delivered = report.delivered,
            failed = report.failed,
            remaining,
            "Broadcast pass complete"
        );
        report
    }

    /// Cumulative counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The registry this dispatcher reads
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
