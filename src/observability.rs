//! Observability (metrics counters)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_created: AtomicU64,
    tasks_deleted: AtomicU64,
    extensions_installed: AtomicU64,
    relay_requests: AtomicU64,
    relay_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks_created(&self, count: u64) {
        self.tasks_created.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_created", count, "Metric incremented");
    }

    pub fn task_delete_requested(&self) {
        self.tasks_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_deleted", "Metric incremented");
    }

    pub fn extension_installed(&self) {
        self.extensions_installed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "extensions_installed", "Metric incremented");
    }

    pub fn relay_request(&self) {
        self.relay_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relay_requests", "Metric incremented");
    }

    pub fn relay_failed(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relay_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_created: self.tasks_created.load(Ordering::Relaxed),
            tasks_deleted: self.tasks_deleted.load(Ordering::Relaxed),
            extensions_installed: self.extensions_installed.load(Ordering::Relaxed),
            relay_requests: self.relay_requests.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub tasks_created: u64,
    /// Delete commands accepted, not tasks removed
    pub tasks_deleted: u64,
    pub extensions_installed: u64,
    pub relay_requests: u64,
    pub relay_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.tasks_created(3);
        metrics.tasks_created(1);
        metrics.relay_request();
        metrics.relay_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_created, 4);
        assert_eq!(snapshot.relay_requests, 1);
        assert_eq!(snapshot.relay_failures, 1);
        assert_eq!(snapshot.extensions_installed, 0);
    }
}
