//! Source descriptor: one configured origin of job postings

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitConfig;
use crate::utils::constants::{ANTI_BOT_DOMAINS, JS_SPA_DOMAINS};

/// Mechanism by which a source is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Rss,
    Json,
    Html,
    Headless,
}

impl Transport {
    /// Parse a configuration string, rejecting unknown values with an
    /// error that names the invalid value.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "rss" => Ok(Self::Rss),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "headless" => Ok(Self::Headless),
            other => Err(format!("invalid feed type: {other:?}")),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::Json => "json",
            Self::Html => "html",
            Self::Headless => "headless",
        }
    }

    /// Whether this transport needs a registered parser to extract jobs.
    #[must_use]
    pub fn requires_parser(&self) -> bool {
        matches!(self, Self::Html | Self::Headless)
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry/timeout profile for a source, derived from its domain.
///
/// Anti-bot-heavy boards get more retries and longer navigation timeouts;
/// JS single-page apps get fewer retries because each attempt is expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteProfile {
    Generic,
    AntiBot,
    JsSpa,
}

impl SiteProfile {
    /// Classify a domain against the known anti-bot / JS-SPA lists.
    #[must_use]
    pub fn for_domain(domain: &str) -> Self {
        if ANTI_BOT_DOMAINS.iter().any(|d| domain.ends_with(d)) {
            Self::AntiBot
        } else if JS_SPA_DOMAINS.iter().any(|d| domain.ends_with(d)) {
            Self::JsSpa
        } else {
            Self::Generic
        }
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::Generic => 3,
            Self::AntiBot => 5,
            Self::JsSpa => 2,
        }
    }

    /// Headless navigation timeout for this profile.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        match self {
            Self::Generic => Duration::from_secs(45),
            Self::AntiBot => Duration::from_secs(60),
            Self::JsSpa => Duration::from_secs(90),
        }
    }
}

/// Configuration for one origin. Runtime state (error counts, last fetch
/// time, quarantine) lives in the orchestrator's source-state table, not
/// here, so descriptors stay cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Unique name within the configuration.
    pub name: String,
    pub url: String,
    pub transport: Transport,
    /// Resolves to a registered parser when `transport` is html/headless.
    pub parser_id: Option<String>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Per-source override of the default token-bucket parameters.
    pub rate_limit: Option<RateLimitConfig>,
    /// How long fetched results may be served from cache.
    pub cache_duration: Duration,
}

impl Feed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport,
            parser_id: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            rate_limit: None,
            cache_duration: Duration::from_secs(30 * 60),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser_id: impl Into<String>) -> Self {
        self.parser_id = Some(parser_id.into());
        self
    }

    /// Host portion of the feed URL, empty when the URL does not parse.
    #[must_use]
    pub fn domain(&self) -> String {
        crate::utils::extract_domain(&self.url).unwrap_or_default()
    }

    /// Retry/timeout profile derived from the feed's domain.
    #[must_use]
    pub fn profile(&self) -> SiteProfile {
        SiteProfile::for_domain(&self.domain())
    }
}
