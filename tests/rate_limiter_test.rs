//! Tests for the token-bucket rate limiter and its backoff behavior
//!
//! Clock-sensitive tests run under a paused tokio clock so refill math is
//! exact and nothing actually sleeps.

use std::time::Duration;

use jobscout::{BackoffStrategy, RateLimitConfig, RateLimiter, TokenBucket};

fn bucket(max: f64, refill: f64) -> TokenBucket {
    TokenBucket::new(RateLimitConfig {
        max_tokens: max,
        refill_rate: refill,
        ..RateLimitConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn refill_over_time() {
    let bucket = bucket(10.0, 2.0);

    for _ in 0..10 {
        assert!(bucket.consume(1.0));
    }
    assert!(!bucket.consume(1.0));
    assert!((bucket.tokens() - 0.0).abs() < 1e-6);

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!((bucket.tokens() - 6.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn refill_caps_at_max_tokens() {
    let bucket = bucket(10.0, 2.0);
    assert!(bucket.consume(4.0));

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert!((bucket.tokens() - 10.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn wait_time_reflects_deficit() {
    let bucket = bucket(10.0, 2.0);
    for _ in 0..10 {
        assert!(bucket.consume(1.0));
    }
    // One token at 2/s is half a second away.
    let wait = bucket.wait_time(1.0);
    assert!((wait.as_secs_f64() - 0.5).abs() < 1e-3);
}

#[test]
fn exponential_backoff_growth() {
    let bucket = TokenBucket::new(RateLimitConfig {
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(300),
        strategy: BackoffStrategy::Exponential,
        multiplier: 2.0,
        ..RateLimitConfig::default()
    });

    bucket.record_failure();
    assert_eq!(bucket.backoff_time(), Duration::from_secs(1));
    bucket.record_failure();
    assert_eq!(bucket.backoff_time(), Duration::from_secs(2));
    bucket.record_failure();
    assert_eq!(bucket.backoff_time(), Duration::from_secs(4));

    bucket.record_success();
    assert_eq!(bucket.consecutive_failures(), 0);
    assert_eq!(bucket.backoff_time(), Duration::ZERO);
}

#[test]
fn linear_and_fibonacci_backoff() {
    let linear = TokenBucket::new(RateLimitConfig {
        initial_backoff: Duration::from_secs(2),
        strategy: BackoffStrategy::Linear,
        ..RateLimitConfig::default()
    });
    linear.record_failure();
    linear.record_failure();
    linear.record_failure();
    assert_eq!(linear.backoff_time(), Duration::from_secs(6));

    let fib = TokenBucket::new(RateLimitConfig {
        initial_backoff: Duration::from_secs(1),
        strategy: BackoffStrategy::Fibonacci,
        ..RateLimitConfig::default()
    });
    fib.record_failure();
    assert_eq!(fib.backoff_time(), Duration::from_secs(1));
    fib.record_failure();
    assert_eq!(fib.backoff_time(), Duration::from_secs(2));
    fib.record_failure();
    assert_eq!(fib.backoff_time(), Duration::from_secs(3));
    fib.record_failure();
    assert_eq!(fib.backoff_time(), Duration::from_secs(5));
}

#[test]
fn backoff_clamps_at_max() {
    let bucket = TokenBucket::new(RateLimitConfig {
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(300),
        strategy: BackoffStrategy::Exponential,
        multiplier: 2.0,
        ..RateLimitConfig::default()
    });
    for _ in 0..20 {
        bucket.record_failure();
    }
    assert_eq!(bucket.backoff_time(), Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn acquisitions_respect_refill_spacing() {
    // Bucket of one token refilling at 2/s: once drained, successive
    // acquisitions cannot land closer together than half a second.
    let limiter = RateLimiter::new();
    let config = RateLimitConfig {
        max_tokens: 1.0,
        refill_rate: 2.0,
        ..RateLimitConfig::default()
    };

    assert!(limiter.acquire("spacing", Some(config.clone())).await);

    let before = tokio::time::Instant::now();
    assert!(limiter.acquire("spacing", Some(config.clone())).await);
    let elapsed = before.elapsed();
    assert!(
        elapsed >= Duration::from_millis(499),
        "second acquisition landed after only {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn record_error_grows_backoff() {
    let limiter = RateLimiter::new();
    assert!(limiter.acquire("flaky", None).await);

    limiter.record_error("flaky", jobscout::ErrorKind::Transient);
    limiter.record_error("flaky", jobscout::ErrorKind::Transient);

    // Source backoff is 2s at two failures; the global bucket also took
    // the failures and imposes 4s (initial 2s, doubled once).
    let backoff = limiter.backoff_for("flaky");
    assert_eq!(backoff, Duration::from_secs(4));

    let before = tokio::time::Instant::now();
    assert!(limiter.acquire("flaky", None).await);
    assert!(before.elapsed() >= Duration::from_secs(4));

    // Success cleared the failure counters.
    assert_eq!(limiter.backoff_for("flaky"), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn per_source_buckets_are_independent() {
    let limiter = RateLimiter::new();
    let tight = RateLimitConfig {
        max_tokens: 1.0,
        refill_rate: 0.1,
        ..RateLimitConfig::default()
    };

    assert!(limiter.acquire("tight", Some(tight)).await);
    // A different source is untouched by the tight bucket.
    let before = tokio::time::Instant::now();
    assert!(limiter.acquire("roomy", None).await);
    assert_eq!(before.elapsed(), Duration::ZERO);
    assert_eq!(limiter.tracked_sources(), 2);
}
