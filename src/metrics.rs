use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks counters and timings for drops, collection and decoding
#[derive(Debug, Default)]
pub struct LoadMetrics {
    decode_times: RwLock<HashMap<String, Duration>>,
    last_collect_time: RwLock<Option<Duration>>,
    files_collected: AtomicU64,
    entries_skipped: AtomicU64,
    resolver_hits: AtomicU64,
    resolver_misses: AtomicU64,
    drops_discarded: AtomicU64,
}

impl LoadMetrics {
    /// Create a new instance of LoadMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished traversal
    pub fn record_collection(&self, files: usize, duration: Duration) {
        self.files_collected
            .fetch_add(files as u64, Ordering::Relaxed);
        *self.last_collect_time.write() = Some(duration);
    }

    /// Record an entry the collector had to skip
    pub fn record_skipped_entry(&self) {
        self.entries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the decode time for a scene file
    pub fn record_decode_time(&self, path: String, duration: Duration) {
        self.decode_times.write().insert(path, duration);
    }

    /// Record a resolver lookup outcome
    pub fn record_resolution(&self, found: bool) {
        if found {
            self.resolver_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.resolver_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a drop whose result arrived after a newer drop started
    pub fn record_discarded_drop(&self) {
        self.drops_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_collected(&self) -> u64 {
        self.files_collected.load(Ordering::Relaxed)
    }

    pub fn entries_skipped(&self) -> u64 {
        self.entries_skipped.load(Ordering::Relaxed)
    }

    pub fn resolver_hits(&self) -> u64 {
        self.resolver_hits.load(Ordering::Relaxed)
    }

    pub fn resolver_misses(&self) -> u64 {
        self.resolver_misses.load(Ordering::Relaxed)
    }

    pub fn drops_discarded(&self) -> u64 {
        self.drops_discarded.load(Ordering::Relaxed)
    }

    /// Duration of the most recent traversal
    pub fn last_collect_time(&self) -> Option<Duration> {
        *self.last_collect_time.read()
    }

    /// Decode time of a scene file, if it was decoded
    pub fn decode_time(&self, path: &str) -> Option<Duration> {
        self.decode_times.read().get(path).cloned()
    }

    /// Fraction of resolver lookups that found a file, as a percentage
    pub fn resolver_hit_rate(&self) -> f32 {
        let hits = self.resolver_hits() as f32;
        let misses = self.resolver_misses() as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }
}

/// A thread-safe wrapper around LoadMetrics
#[derive(Debug, Clone, Default)]
pub struct LoadMetricsHandle(Arc<LoadMetrics>);

impl LoadMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(LoadMetrics::new()))
    }
}

impl std::ops::Deref for LoadMetricsHandle {
    type Target = LoadMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
