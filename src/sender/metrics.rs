use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryMetrics {
    pub batches_attempted: u64,
    pub batches_succeeded: u64,
    pub records_delivered: u64,
    pub records_resent: u64,
    pub records_discarded: u64,
    pub transport_failures: u64,
    pub throughput_exceeded: u64,
}

/// Lock-free delivery counters, cheap to clone and share with the host.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    batches_attempted: Arc<AtomicU64>,
    batches_succeeded: Arc<AtomicU64>,
    records_delivered: Arc<AtomicU64>,
    records_resent: Arc<AtomicU64>,
    records_discarded: Arc<AtomicU64>,
    transport_failures: Arc<AtomicU64>,
    throughput_exceeded: Arc<AtomicU64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.batches_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, records: usize) {
        self.batches_succeeded.fetch_add(1, Ordering::Relaxed);
        self.records_delivered
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_partial(&self, delivered: usize, resent: usize) {
        self.records_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.records_resent.fetch_add(resent as u64, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, records: usize) {
        self.records_discarded
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throughput_exceeded(&self) {
        self.throughput_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryMetrics {
        DeliveryMetrics {
            batches_attempted: self.batches_attempted.load(Ordering::Relaxed),
            batches_succeeded: self.batches_succeeded.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            records_resent: self.records_resent.load(Ordering::Relaxed),
            records_discarded: self.records_discarded.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            throughput_exceeded: self.throughput_exceeded.load(Ordering::Relaxed),
        }
    }
}
