//! Typed configuration loading
//!
//! The YAML file shape is owned by the external CLI; this module gives it
//! a typed loader with validation so schema errors surface before any
//! fetch starts.

pub mod loader;
pub mod types;

pub use loader::{load_feeds, load_file, ConfigError};
pub use types::{FeedSpec, FeedsFile, FilterConfig, RateLimitOverride};
