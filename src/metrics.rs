use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Performance metrics for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub scans_started: Arc<AtomicUsize>,
    pub scans_completed: Arc<AtomicUsize>,
    pub scans_failed: Arc<AtomicUsize>,
    pub subtree_failures: Arc<AtomicUsize>,
    pub cache_hits: Arc<AtomicU64>,
    pub files_indexed: Arc<AtomicU64>,
    pub streams_started: Arc<AtomicU64>,
    pub streams_active: Arc<AtomicUsize>,
    pub bytes_streamed: Arc<AtomicU64>,
    pub range_rejections: Arc<AtomicU64>,
    pub access_denied: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_started: Arc::new(AtomicUsize::new(0)),
            scans_completed: Arc::new(AtomicUsize::new(0)),
            scans_failed: Arc::new(AtomicUsize::new(0)),
            subtree_failures: Arc::new(AtomicUsize::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            files_indexed: Arc::new(AtomicU64::new(0)),
            streams_started: Arc::new(AtomicU64::new(0)),
            streams_active: Arc::new(AtomicUsize::new(0)),
            bytes_streamed: Arc::new(AtomicU64::new(0)),
            range_rejections: Arc::new(AtomicU64::new(0)),
            access_denied: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_scans_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scans_completed(&self) {
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scans_failed(&self) {
        self.scans_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_subtree_failures(&self, count: usize) {
        self.subtree_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Gauge: entry count of the most recent scan.
    pub fn set_files_indexed(&self, count: u64) {
        self.files_indexed.store(count, Ordering::Relaxed);
    }

    pub fn stream_opened(&self) {
        self.streams_started.fetch_add(1, Ordering::Relaxed);
        self.streams_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_closed(&self, bytes: u64) {
        self.streams_active.fetch_sub(1, Ordering::Relaxed);
        self.bytes_streamed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_range_rejections(&self) {
        self.range_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_access_denied(&self) {
        self.access_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans_started: self.scans_started.load(Ordering::Relaxed),
            scans_completed: self.scans_completed.load(Ordering::Relaxed),
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            subtree_failures: self.subtree_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            files_indexed: self.files_indexed.load(Ordering::Relaxed),
            streams_started: self.streams_started.load(Ordering::Relaxed),
            streams_active: self.streams_active.load(Ordering::Relaxed),
            bytes_streamed: self.bytes_streamed.load(Ordering::Relaxed),
            range_rejections: self.range_rejections.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub scans_started: usize,
    pub scans_completed: usize,
    pub scans_failed: usize,
    pub subtree_failures: usize,
    pub cache_hits: u64,
    pub files_indexed: u64,
    pub streams_started: u64,
    pub streams_active: usize,
    pub bytes_streamed: u64,
    pub range_rejections: u64,
    pub access_denied: u64,
    pub uptime_seconds: u64,
}
