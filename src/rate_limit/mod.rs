//! Token-bucket rate limiting with failure-driven backoff
//!
//! Every acquisition consults two buckets: the per-source bucket (created
//! lazily on first reference) and one conservative global bucket. Each
//! bucket's mutable state is guarded by its own mutex held only for the
//! refill+consume computation; the suspension while waiting for tokens is
//! the only blocking point in the limiter.
//!
//! Buckets read the clock through `tokio::time::Instant`, so tests can
//! drive refill deterministically with a paused runtime clock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;

/// Strategy for growing the backoff as consecutive failures accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    Linear,
    #[default]
    Exponential,
    Fibonacci,
}

/// Parameters for one token bucket.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_tokens: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub strategy: BackoffStrategy,
    pub multiplier: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100.0,
            refill_rate: 10.0,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            strategy: BackoffStrategy::Exponential,
            multiplier: 2.0,
        }
    }
}

impl RateLimitConfig {
    /// Conservative parameters for the shared global bucket.
    #[must_use]
    pub fn global() -> Self {
        Self {
            max_tokens: 50.0,
            refill_rate: 5.0,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(600),
            ..Self::default()
        }
    }

    /// Build a per-source override from the configuration file's
    /// `requests_per_minute` / `retry_after` pair.
    #[must_use]
    pub fn from_overrides(requests_per_minute: u32, retry_after: Option<u64>) -> Self {
        let mut config = Self {
            refill_rate: f64::from(requests_per_minute) / 60.0,
            max_tokens: f64::from(requests_per_minute.max(1)),
            ..Self::default()
        };
        if let Some(secs) = retry_after {
            config.initial_backoff = Duration::from_secs(secs);
        }
        config
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Token bucket with failure tracking.
///
/// Invariant: `0 <= tokens <= max_tokens`; tokens are refilled as
/// `min(max_tokens, tokens + elapsed * refill_rate)` and decremented only
/// on successful consumption.
#[derive(Debug)]
pub struct TokenBucket {
    config: RateLimitConfig,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let state = BucketState {
            tokens: config.max_tokens,
            last_refill: Instant::now(),
            consecutive_failures: 0,
            last_failure: None,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens =
            (state.tokens + elapsed * self.config.refill_rate).min(self.config.max_tokens);
        state.last_refill = now;
    }

    /// Whether `n` tokens could be consumed right now, without consuming.
    #[must_use]
    pub fn can_consume(&self, n: f64) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens >= n
    }

    /// Attempt to consume `n` tokens. Returns false when the bucket is dry.
    pub fn consume(&self, n: f64) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= n {
            state.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Time until `n` tokens will be available, zero if they already are.
    #[must_use]
    pub fn wait_time(&self, n: f64) -> Duration {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= n {
            return Duration::ZERO;
        }
        let deficit = n - state.tokens;
        Duration::from_secs_f64(deficit / self.config.refill_rate)
    }

    /// Current token count after a refill pass.
    #[must_use]
    pub fn tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        state.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        self.state.lock().consecutive_failures = 0;
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Backoff imposed by accumulated failures, on top of the bucket's
    /// natural pacing. Zero when there are no consecutive failures.
    #[must_use]
    pub fn backoff_time(&self) -> Duration {
        let failures = self.state.lock().consecutive_failures;
        if failures == 0 {
            return Duration::ZERO;
        }

        let base = self.config.initial_backoff;
        let backoff = match self.config.strategy {
            BackoffStrategy::Linear => base.mul_f64(f64::from(failures)),
            BackoffStrategy::Exponential => {
                base.mul_f64(self.config.multiplier.powi(failures as i32 - 1))
            }
            BackoffStrategy::Fibonacci => base.mul_f64(fibonacci(failures) as f64),
        };

        backoff.min(self.config.max_backoff)
    }
}

/// Fibonacci term used for backoff growth: 1, 1, 2, 3, 5, ...
fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (1u64, 1u64);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

/// Rate limiter managing per-source buckets plus one global bucket.
pub struct RateLimiter {
    buckets: DashMap<String, Arc<TokenBucket>>,
    global: TokenBucket,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            global: TokenBucket::new(RateLimitConfig::global()),
        }
    }

    /// Get or lazily create the bucket for a source. The configuration is
    /// only applied on first reference; later calls return the existing
    /// bucket untouched.
    pub fn bucket(&self, source: &str, config: Option<RateLimitConfig>) -> Arc<TokenBucket> {
        self.buckets
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(config.unwrap_or_default())))
            .clone()
    }

    /// Acquire `n` tokens for a request against `source`.
    ///
    /// Suspends for the maximum of the source/global refill waits and the
    /// source/global backoffs, then attempts to consume from both buckets.
    /// Success and failure are recorded in both. A false return means the
    /// bucket went dry between the wait and the consume (a race with a
    /// concurrent acquirer).
    pub async fn acquire_n(
        &self,
        source: &str,
        n: f64,
        config: Option<RateLimitConfig>,
    ) -> bool {
        let bucket = self.bucket(source, config);

        let wait = bucket
            .wait_time(n)
            .max(self.global.wait_time(n))
            .max(bucket.backoff_time())
            .max(self.global.backoff_time());

        if wait > Duration::ZERO {
            info!(source, wait_secs = wait.as_secs_f64(), "rate limiting source");
            tokio::time::sleep(wait).await;
        }

        let source_ok = bucket.consume(n);
        let global_ok = self.global.consume(n);
        let success = source_ok && global_ok;

        if success {
            bucket.record_success();
            self.global.record_success();
        } else {
            debug!(source, "token bucket drained between wait and consume");
            bucket.record_failure();
            self.global.record_failure();
        }

        success
    }

    /// Acquire a single token (the common case).
    pub async fn acquire(&self, source: &str, config: Option<RateLimitConfig>) -> bool {
        self.acquire_n(source, 1.0, config).await
    }

    /// Record a fetch error against a source, growing its backoff and the
    /// global backoff.
    pub fn record_error(&self, source: &str, kind: ErrorKind) {
        let bucket = self.bucket(source, None);
        bucket.record_failure();
        self.global.record_failure();
        warn!(source, kind = kind.as_str(), "recorded fetch error");
    }

    /// Backoff currently imposed on a source (includes the global share).
    #[must_use]
    pub fn backoff_for(&self, source: &str) -> Duration {
        let bucket = self.bucket(source, None);
        bucket.backoff_time().max(self.global.backoff_time())
    }

    /// Number of sources with a live bucket.
    #[must_use]
    pub fn tracked_sources(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_terms() {
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 2);
        assert_eq!(fibonacci(3), 3);
        assert_eq!(fibonacci(4), 5);
        assert_eq!(fibonacci(5), 8);
    }

    #[tokio::test]
    async fn bucket_never_exceeds_capacity() {
        let bucket = TokenBucket::new(RateLimitConfig {
            max_tokens: 5.0,
            refill_rate: 100.0,
            ..RateLimitConfig::default()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bucket.tokens() <= 5.0);
    }

    #[test]
    fn backoff_zero_without_failures() {
        let bucket = TokenBucket::new(RateLimitConfig::default());
        assert_eq!(bucket.backoff_time(), Duration::ZERO);
    }
}
