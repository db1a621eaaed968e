use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracked when [`crate::Config::enable_metrics`] is set.
///
/// Each field is an independent `AtomicU64` updated with `Relaxed` ordering:
/// these are plain counters, not synchronization points, so no ordering
/// stronger than `Relaxed` is needed to keep them wait-free on the hot path.
#[derive(Debug, Default)]
pub struct Metrics {
    items_pushed: AtomicU64,
    items_popped: AtomicU64,
    push_failures: AtomicU64,
    consumer_notifications: AtomicU64,
    producer_notifications: AtomicU64,
    batches_drained: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_items_pushed(&self, n: u64) {
        self.items_pushed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_items_popped(&self, n: u64) {
        self.items_popped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_push_failure(&self) {
        self.push_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_consumer_notification(&self) {
        self.consumer_notifications.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_producer_notification(&self) {
        self.producer_notifications.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batch_drained(&self) {
        self.batches_drained.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of all counters for reporting.
    /// Individual fields may be read at slightly different instants, which
    /// is acceptable for monitoring purposes.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_pushed: self.items_pushed.load(Ordering::Relaxed),
            items_popped: self.items_popped.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
            consumer_notifications: self.consumer_notifications.load(Ordering::Relaxed),
            producer_notifications: self.producer_notifications.load(Ordering::Relaxed),
            batches_drained: self.batches_drained.load(Ordering::Relaxed),
        }
    }
}

/// Plain-data snapshot of [`Metrics`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_pushed: u64,
    pub items_popped: u64,
    pub push_failures: u64,
    pub consumer_notifications: u64,
    pub producer_notifications: u64,
    pub batches_drained: u64,
}
