//! Ingest counters for an external collector
//!
//! Counters are additive and only ever reset through the explicit
//! `reset()` operation. Labelled counters live in concurrent maps keyed by
//! source (and error kind); scalar counters are plain atomics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::ErrorKind;

#[derive(Debug)]
pub struct IngestMetrics {
    jobs_fetched: DashMap<String, u64>,
    /// Keyed `source:kind`.
    fetch_errors: DashMap<String, u64>,
    rate_limit_hits: DashMap<String, u64>,
    duplicates_removed: AtomicU64,
    expired_jobs_removed: AtomicU64,
    response_time_total_micros: AtomicU64,
    response_time_count: AtomicU64,
    started: Instant,
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs_fetched: DashMap::new(),
            fetch_errors: DashMap::new(),
            rate_limit_hits: DashMap::new(),
            duplicates_removed: AtomicU64::new(0),
            expired_jobs_removed: AtomicU64::new(0),
            response_time_total_micros: AtomicU64::new(0),
            response_time_count: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_jobs_fetched(&self, source: &str, count: u64) {
        *self.jobs_fetched.entry(source.to_string()).or_insert(0) += count;
    }

    pub fn record_fetch_error(&self, source: &str, kind: ErrorKind) {
        let key = format!("{source}:{}", kind.as_str());
        *self.fetch_errors.entry(key).or_insert(0) += 1;
    }

    pub fn record_rate_limit_hit(&self, source: &str) {
        *self.rate_limit_hits.entry(source.to_string()).or_insert(0) += 1;
    }

    pub fn record_duplicates_removed(&self, count: u64) {
        self.duplicates_removed.fetch_add(count, Ordering::SeqCst);
    }

    pub fn record_expired_removed(&self, count: u64) {
        self.expired_jobs_removed.fetch_add(count, Ordering::SeqCst);
    }

    pub fn record_response_time(&self, elapsed: Duration) {
        self.response_time_total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::SeqCst);
        self.response_time_count.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let count = self.response_time_count.load(Ordering::SeqCst);
        let mean_response_time = if count > 0 {
            let total = self.response_time_total_micros.load(Ordering::SeqCst);
            Some(Duration::from_micros(total / count))
        } else {
            None
        };

        MetricsSnapshot {
            jobs_fetched: collect(&self.jobs_fetched),
            fetch_errors: collect(&self.fetch_errors),
            rate_limit_hits: collect(&self.rate_limit_hits),
            duplicates_removed: self.duplicates_removed.load(Ordering::SeqCst),
            expired_jobs_removed: self.expired_jobs_removed.load(Ordering::SeqCst),
            mean_response_time,
            uptime: self.started.elapsed(),
        }
    }

    /// The only way counters go backwards.
    pub fn reset(&self) {
        self.jobs_fetched.clear();
        self.fetch_errors.clear();
        self.rate_limit_hits.clear();
        self.duplicates_removed.store(0, Ordering::SeqCst);
        self.expired_jobs_removed.store(0, Ordering::SeqCst);
        self.response_time_total_micros.store(0, Ordering::SeqCst);
        self.response_time_count.store(0, Ordering::SeqCst);
    }
}

fn collect(map: &DashMap<String, u64>) -> HashMap<String, u64> {
    map.iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect()
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_fetched: HashMap<String, u64>,
    pub fetch_errors: HashMap<String, u64>,
    pub rate_limit_hits: HashMap<String, u64>,
    pub duplicates_removed: u64,
    pub expired_jobs_removed: u64,
    pub mean_response_time: Option<Duration>,
    pub uptime: Duration,
}
