//! Configuration file shapes
//!
//! Mirrors the YAML the CLI hands us:
//!
//! ```yaml
//! feeds:
//!   - name: remotive
//!     url: https://remotive.com/remote-jobs/customer-support
//!     type: headless
//!     parser: remotive
//!     rate_limit: { requests_per_minute: 10, retry_after: 30 }
//! filters:
//!   keywords: [support]
//!   is_remote: true
//! ```

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct FeedsFile {
    #[serde(default)]
    pub feeds: Vec<FeedSpec>,
    #[serde(default)]
    pub filters: Option<FilterConfig>,
}

/// One feed entry as written in YAML. `type` is kept a plain string here
/// so validation can reject unknown values with an error naming them.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub feed_type: String,
    #[serde(default)]
    pub parser: Option<String>,
    /// Defaults to `type` when absent.
    #[serde(default)]
    pub fetch_method: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitOverride>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub cookies: HashMap<String, String>,
    /// Cache duration in minutes.
    #[serde(default)]
    pub cache_duration: Option<u64>,
}

/// Per-feed rate limit override.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitOverride {
    pub requests_per_minute: u32,
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// The `filters:` block consumed by the external search surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub job_types: Vec<String>,
    #[serde(default)]
    pub experience_levels: Vec<String>,
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub sources: Vec<String>,
}
