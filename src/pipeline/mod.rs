//! Orchestrator: per-source dispatch, retries and the post-fetch pipeline
//!
//! Sources run with bounded parallelism; within one source everything is
//! serial. The orchestrator is the single place where retry/abort
//! decisions are made: fetchers hand it typed errors and it consults the
//! `ErrorKind` classification. The rate limiter's failure counters are the
//! single source of truth for backoff magnitude.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::browser::BrowserPool;
use crate::dedup::JobDeduplicator;
use crate::error::{ErrorKind, FetchError};
use crate::fetch::{HeadlessFetcher, StaticFetcher};
use crate::matcher::SmartMatcher;
use crate::metrics::IngestMetrics;
use crate::model::{Feed, Job, Transport};
use crate::parsers::ParserRegistry;
use crate::rate_limit::RateLimiter;
use crate::utils::constants::{DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_CONCURRENT_SOURCES};

/// Runtime state for one source. Not persisted across restarts.
#[derive(Debug, Clone, Default)]
pub struct SourceState {
    pub error_count: u32,
    pub last_error: String,
    pub last_fetched: Option<DateTime<Utc>>,
    /// Set when a challenge could not be cleared; the source is skipped
    /// for the remainder of the run and re-armed on the next one.
    pub quarantined: bool,
}

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_concurrent_sources: usize,
    pub max_age_days: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

/// Drives every configured source through fetch → parse → filter → dedup.
pub struct Orchestrator {
    rate_limiter: Arc<RateLimiter>,
    static_fetcher: StaticFetcher,
    headless_fetcher: HeadlessFetcher,
    registry: Arc<ParserRegistry>,
    matcher: SmartMatcher,
    dedup: JobDeduplicator,
    metrics: Arc<IngestMetrics>,
    pool: Arc<BrowserPool>,
    states: DashMap<String, SourceState>,
    config: OrchestratorConfig,
    shutdown: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        pool: Arc<BrowserPool>,
        rate_limiter: Arc<RateLimiter>,
        registry: Arc<ParserRegistry>,
        matcher: SmartMatcher,
        dedup: JobDeduplicator,
        metrics: Arc<IngestMetrics>,
        config: OrchestratorConfig,
    ) -> Result<Self, FetchError> {
        let static_fetcher = StaticFetcher::new()?;
        let headless_fetcher = HeadlessFetcher::new(Arc::clone(&pool), Arc::clone(&registry));
        Ok(Self {
            rate_limiter,
            static_fetcher,
            headless_fetcher,
            registry,
            matcher,
            dedup,
            metrics,
            pool,
            states: DashMap::new(),
            config,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Convenience constructor with default policies.
    pub fn with_defaults(pool: Arc<BrowserPool>) -> Result<Self, FetchError> {
        Self::new(
            pool,
            Arc::new(RateLimiter::new()),
            Arc::new(ParserRegistry::with_default_parsers()),
            SmartMatcher::default(),
            JobDeduplicator::default(),
            Arc::new(IngestMetrics::new()),
            OrchestratorConfig::default(),
        )
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Runtime state of a source, if it has been fetched this process.
    #[must_use]
    pub fn source_state(&self, name: &str) -> Option<SourceState> {
        self.states.get(name).map(|s| s.clone())
    }

    /// Run one full ingestion pass over the given feeds.
    ///
    /// Sources run concurrently up to the configured bound; ordering of
    /// jobs across sources is not guaranteed. Only fatal errors (pool
    /// init, configuration) propagate; everything else degrades to an
    /// empty batch for that source.
    pub async fn run(&self, feeds: &[Feed]) -> Result<Vec<Job>, FetchError> {
        // Challenge quarantine lasts one run.
        for mut state in self.states.iter_mut() {
            state.quarantined = false;
        }

        let results: Vec<Result<Vec<Job>, FetchError>> = futures::stream::iter(feeds)
            .map(|feed| self.run_source(feed))
            .buffer_unordered(self.config.max_concurrent_sources)
            .collect()
            .await;

        let mut all_jobs = Vec::new();
        for result in results {
            all_jobs.extend(result?);
        }
        Ok(all_jobs)
    }

    /// Fetch one source under the retry policy.
    ///
    /// Transient errors retry under the limiter's backoff, permanent ones
    /// abort with an empty batch, an uncleared challenge quarantines the
    /// source, fatal errors propagate.
    pub async fn run_source(&self, feed: &Feed) -> Result<Vec<Job>, FetchError> {
        if let Some(state) = self.states.get(&feed.name) {
            if state.quarantined {
                info!(feed = %feed.name, "source quarantined, skipping this run");
                return Ok(Vec::new());
            }
            // Within the cache window the previous batch is still good;
            // re-fetching would only burn tokens.
            if let Some(last) = state.last_fetched {
                let age = (Utc::now() - last).to_std().unwrap_or_default();
                if age < feed.cache_duration {
                    info!(feed = %feed.name, "cache window still fresh, skipping fetch");
                    return Ok(Vec::new());
                }
            }
        }

        let max_retries = feed.profile().max_retries();
        let mut attempts = 0u32;

        while attempts < max_retries {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(Vec::new());
            }

            // The acquire sleeps out both the bucket wait and the backoff
            // accumulated from previous failures, so the retry delay and
            // the pacing share one mechanism.
            let acquired = self
                .rate_limiter
                .acquire(&feed.name, feed.rate_limit.clone())
                .await;
            if !acquired {
                self.metrics.record_rate_limit_hit(&feed.name);
                attempts += 1;
                continue;
            }

            let started = Instant::now();
            match self.dispatch(feed).await {
                Ok(jobs) => {
                    self.metrics.record_response_time(started.elapsed());
                    self.record_success(&feed.name);
                    return Ok(self.post_process(feed, jobs));
                }
                Err(err) => {
                    let kind = err.kind();
                    self.rate_limiter.record_error(&feed.name, kind);
                    self.metrics.record_fetch_error(&feed.name, kind);
                    self.record_failure(&feed.name, &err);

                    match kind {
                        ErrorKind::Transient => {
                            warn!(feed = %feed.name, error = %err, attempt = attempts + 1, "transient fetch error, will retry");
                            attempts += 1;
                        }
                        ErrorKind::Permanent => {
                            warn!(feed = %feed.name, error = %err, "permanent fetch error, giving up this run");
                            return Ok(Vec::new());
                        }
                        ErrorKind::Challenge => {
                            warn!(feed = %feed.name, "challenge not cleared, quarantining source");
                            self.states.entry(feed.name.clone()).or_default().quarantined =
                                true;
                            return Ok(Vec::new());
                        }
                        ErrorKind::Fatal => {
                            error!(feed = %feed.name, error = %err, "fatal error");
                            return Err(err);
                        }
                    }
                }
            }
        }

        warn!(feed = %feed.name, "retries exhausted");
        Ok(Vec::new())
    }

    async fn dispatch(&self, feed: &Feed) -> Result<Vec<Job>, FetchError> {
        match feed.transport {
            Transport::Rss => self.static_fetcher.fetch_rss(feed).await,
            Transport::Json => self.static_fetcher.fetch_json(feed).await,
            Transport::Html => self.static_fetcher.fetch_html(feed, &self.registry).await,
            Transport::Headless => self.headless_fetcher.fetch(feed).await,
        }
    }

    /// Parse output flows through stable filters in a fixed order:
    /// validity, freshness, interest match, fuzzy dedup. Each preserves
    /// first-occurrence order.
    fn post_process(&self, feed: &Feed, jobs: Vec<Job>) -> Vec<Job> {
        let parsed = jobs.len();

        let fresh: Vec<Job> = jobs
            .into_iter()
            .filter(Job::is_valid)
            .filter(|j| !j.is_expired(self.config.max_age_days))
            .collect();
        let expired = parsed - fresh.len();
        if expired > 0 {
            self.metrics.record_expired_removed(expired as u64);
        }

        let matched = self.matcher.filter(fresh);
        let before_dedup = matched.len();
        let unique = self.dedup.deduplicate(matched);
        let duplicates = before_dedup - unique.len();
        if duplicates > 0 {
            self.metrics.record_duplicates_removed(duplicates as u64);
        }

        self.metrics
            .record_jobs_fetched(&feed.name, unique.len() as u64);
        info!(
            feed = %feed.name,
            parsed,
            expired,
            duplicates,
            kept = unique.len(),
            "source batch processed"
        );
        unique
    }

    fn record_success(&self, source: &str) {
        let mut state = self.states.entry(source.to_string()).or_default();
        state.error_count = 0;
        state.last_error.clear();
        state.last_fetched = Some(Utc::now());
    }

    fn record_failure(&self, source: &str, err: &FetchError) {
        let mut state = self.states.entry(source.to_string()).or_default();
        state.error_count += 1;
        state.last_error = err.to_string();
    }

    /// Stop accepting work and tear down the browser pool. Bounded; safe
    /// to call from a process-exit handler.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.pool.shutdown().await;
    }
}
