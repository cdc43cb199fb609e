//! Shared configuration constants
//!
//! Default values used throughout the codebase to ensure consistency and
//! avoid magic numbers.

use std::time::Duration;

/// Chrome user agent string presented by both the static client and the
/// headless browser.
///
/// Updated: 2025-01-29 to Chrome 132 (current stable).
/// Chrome releases new stable versions ~every 4 weeks; refresh quarterly
/// to stay within a reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Static HTTP request timeout.
pub const STATIC_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single cookie save.
pub const COOKIE_SAVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pool mutex acquisition bound in normal paths. Operations that cannot
/// take the lock within this window are skipped, never blocked.
pub const POOL_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Pool mutex acquisition bound during shutdown.
pub const POOL_LOCK_TIMEOUT_SHUTDOWN: Duration = Duration::from_millis(50);

/// Maximum number of long-lived browser contexts kept per pool.
pub const DEFAULT_MAX_CONTEXTS: usize = 3;

/// Maximum sources fetched concurrently. Requests within one source are
/// always serial.
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 4;

/// Age horizon after which a job without an explicit expiry is dropped.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Directory holding per-domain persisted cookie files.
pub const COOKIES_DIR: &str = "cookies";

/// Probe URL used to health-check egress proxies.
pub const PROXY_PROBE_URL: &str = "https://httpbin.org/ip";

/// Domains known to front aggressive anti-bot protection. These get the
/// `AntiBot` site profile (more retries, longer navigation timeout) and a
/// rotating proxy when one is configured.
pub const ANTI_BOT_DOMAINS: &[&str] = &["indeed.com", "linkedin.com", "glassdoor.com"];

/// Domains serving JS single-page apps where a render is expensive enough
/// that fewer, longer attempts beat many short ones.
pub const JS_SPA_DOMAINS: &[&str] = &["snaphunt.com", "remote3.co"];
