//! YAML loading and validation

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::model::{Feed, Transport};
use crate::parsers::ParserRegistry;
use crate::rate_limit::RateLimitConfig;

use super::types::{FeedSpec, FeedsFile};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    InvalidFeedType(String),

    #[error("feed {0:?} has an empty url")]
    EmptyUrl(String),

    #[error("duplicate feed name {0:?}")]
    DuplicateName(String),

    #[error("feed {feed:?} uses transport {transport} but names no parser")]
    MissingParser { feed: String, transport: Transport },

    #[error("feed {feed:?} names unknown parser {parser:?}")]
    UnknownParser { feed: String, parser: String },
}

/// Read and deserialize a configuration file without validating it.
pub fn load_file(path: &Path) -> Result<FeedsFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load, validate and convert a configuration file into runtime feed
/// descriptors. When a registry is supplied, html/headless parser IDs
/// must resolve to a registered parser.
pub fn load_feeds(
    path: &Path,
    registry: Option<&ParserRegistry>,
) -> Result<Vec<Feed>, ConfigError> {
    let file = load_file(path)?;
    let feeds = build_feeds(file.feeds, registry)?;
    info!(count = feeds.len(), path = %path.display(), "loaded feed configuration");
    Ok(feeds)
}

/// Validate and convert deserialized specs.
pub fn build_feeds(
    specs: Vec<FeedSpec>,
    registry: Option<&ParserRegistry>,
) -> Result<Vec<Feed>, ConfigError> {
    let mut names: HashSet<String> = HashSet::new();
    let mut feeds = Vec::with_capacity(specs.len());

    for spec in specs {
        if !names.insert(spec.name.clone()) {
            return Err(ConfigError::DuplicateName(spec.name));
        }
        if spec.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl(spec.name));
        }

        Transport::parse(&spec.feed_type).map_err(ConfigError::InvalidFeedType)?;

        // fetch_method overrides type for dispatch; both must be known.
        let transport = match &spec.fetch_method {
            Some(method) => Transport::parse(method).map_err(ConfigError::InvalidFeedType)?,
            None => Transport::parse(&spec.feed_type).map_err(ConfigError::InvalidFeedType)?,
        };

        if transport.requires_parser() {
            let parser = spec.parser.clone().filter(|p| !p.trim().is_empty());
            let Some(parser) = parser else {
                return Err(ConfigError::MissingParser {
                    feed: spec.name,
                    transport,
                });
            };
            if let Some(registry) = registry {
                if !registry.contains(&parser) {
                    return Err(ConfigError::UnknownParser {
                        feed: spec.name,
                        parser,
                    });
                }
            }
        }

        let mut feed = Feed::new(&spec.name, spec.url.trim(), transport);
        feed.parser_id = spec.parser.filter(|p| !p.trim().is_empty());
        feed.headers = spec.headers;
        feed.cookies = spec.cookies;
        feed.rate_limit = spec
            .rate_limit
            .map(|rl| RateLimitConfig::from_overrides(rl.requests_per_minute, rl.retry_after));
        if let Some(minutes) = spec.cache_duration {
            feed.cache_duration = Duration::from_secs(minutes * 60);
        }

        feeds.push(feed);
    }

    Ok(feeds)
}
