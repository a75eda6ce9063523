//! Orchestration metrics.
//!
//! Lock-free atomic counters recorded by the fetch controller, with a
//! point-in-time snapshot type for display and tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the fetch orchestration pipeline.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    fetches_issued: AtomicU64,
    fetches_completed: AtomicU64,
    fetches_failed: AtomicU64,
    fetches_canceled: AtomicU64,
    fetches_deduplicated: AtomicU64,
    refreshes_issued: AtomicU64,
    refreshes_completed: AtomicU64,
    refreshes_failed: AtomicU64,
}

impl FetchMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_issued(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_completed(&self) {
        self.fetches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_canceled(&self) {
        self.fetches_canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_deduplicated(&self) {
        self.fetches_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_issued(&self) {
        self.refreshes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_completed(&self) {
        self.refreshes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            fetches_issued: self.fetches_issued.load(Ordering::Relaxed),
            fetches_completed: self.fetches_completed.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
            fetches_canceled: self.fetches_canceled.load(Ordering::Relaxed),
            fetches_deduplicated: self.fetches_deduplicated.load(Ordering::Relaxed),
            refreshes_issued: self.refreshes_issued.load(Ordering::Relaxed),
            refreshes_completed: self.refreshes_completed.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FetchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fetches_issued: u64,
    pub fetches_completed: u64,
    pub fetches_failed: u64,
    pub fetches_canceled: u64,
    pub fetches_deduplicated: u64,
    pub refreshes_issued: u64,
    pub refreshes_completed: u64,
    pub refreshes_failed: u64,
}
