//! Per-dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Parts passed to a handler
    parts_handled: AtomicU64,
    /// Parts drained without a handler
    parts_drained: AtomicU64,
    /// Fields passed to a handler
    fields_handled: AtomicU64,
    /// Fields with no matching handler
    fields_ignored: AtomicU64,
    /// Bytes discarded by drains
    bytes_drained: AtomicU64,
    /// Handler invocations that returned an error
    handler_failures: AtomicU64,
    /// Highest number of concurrently pending handlers
    peak_pending: AtomicUsize,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get handled part count
    pub fn parts_handled(&self) -> u64 {
        self.parts_handled.load(Ordering::Relaxed)
    }

    /// Increment handled part count
    pub fn inc_parts_handled(&self) {
        self.parts_handled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get drained part count
    pub fn parts_drained(&self) -> u64 {
        self.parts_drained.load(Ordering::Relaxed)
    }

    /// Increment drained part count
    pub fn inc_parts_drained(&self) {
        self.parts_drained.fetch_add(1, Ordering::Relaxed);
    }

    /// Get handled field count
    pub fn fields_handled(&self) -> u64 {
        self.fields_handled.load(Ordering::Relaxed)
    }

    /// Increment handled field count
    pub fn inc_fields_handled(&self) {
        self.fields_handled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get ignored field count
    pub fn fields_ignored(&self) -> u64 {
        self.fields_ignored.load(Ordering::Relaxed)
    }

    /// Increment ignored field count
    pub fn inc_fields_ignored(&self) {
        self.fields_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Get drained byte count
    pub fn bytes_drained(&self) -> u64 {
        self.bytes_drained.load(Ordering::Relaxed)
    }

    /// Add drained bytes
    pub fn add_bytes_drained(&self, bytes: u64) {
        self.bytes_drained.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get handler failure count
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    /// Increment handler failure count
    pub fn inc_handler_failures(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get peak pending handler count
    pub fn peak_pending(&self) -> usize {
        self.peak_pending.load(Ordering::Relaxed)
    }

    /// Record the current pending handler count
    pub fn observe_pending(&self, pending: usize) {
        self.peak_pending.fetch_max(pending, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            parts_handled: self.parts_handled(),
            parts_drained: self.parts_drained(),
            fields_handled: self.fields_handled(),
            fields_ignored: self.fields_ignored(),
            bytes_drained: self.bytes_drained(),
            handler_failures: self.handler_failures(),
            peak_pending: self.peak_pending(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub parts_handled: u64,
    pub parts_drained: u64,
    pub fields_handled: u64,
    pub fields_ignored: u64,
    pub bytes_drained: u64,
    pub handler_failures: u64,
    pub peak_pending: usize,
}
