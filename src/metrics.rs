use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free dispatch counters.
///
/// Shared by every connection of one dispatcher. Counters only increase;
/// read them through [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    requests: AtomicU64,
    matched: AtomicU64,
    passthrough: AtomicU64,
    rendered: AtomicU64,
    application_faults: AtomicU64,
    unclassified_faults: AtomicU64,
    transport_faults: AtomicU64,
    contexts_released: AtomicU64,
    total_latency_ns: AtomicU64,
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub matched: u64,
    pub passthrough: u64,
    pub rendered: u64,
    pub application_faults: u64,
    pub unclassified_faults: u64,
    pub transport_faults: u64,
    pub contexts_released: u64,
}

impl DispatchMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rendered(&self, latency: Duration) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub(crate) fn record_application_fault(&self) {
        self.application_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unclassified_fault(&self) {
        self.unclassified_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transport_fault(&self) {
        self.transport_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_released(&self) {
        self.contexts_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean latency of rendered requests.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.rendered.load(Ordering::Relaxed);
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            application_faults: self.application_faults.load(Ordering::Relaxed),
            unclassified_faults: self.unclassified_faults.load(Ordering::Relaxed),
            transport_faults: self.transport_faults.load(Ordering::Relaxed),
            contexts_released: self.contexts_released.load(Ordering::Relaxed),
        }
    }
}
