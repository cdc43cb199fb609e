//! Site-specific HTML parsers and the registry that routes to them
//!
//! Each parser is a pure function from a parsed document plus a source
//! descriptor to a sequence of jobs. Parsers never fail: on markup they do
//! not recognize they log the shape they saw and return an empty batch.

pub mod extract;
mod generic;
mod remoteok;
mod remotive;
mod workingnomads;

use std::collections::HashMap;

use scraper::Html;
use tracing::{info, warn};

use crate::model::{Feed, Job};

pub use extract::{content_hash_id, IdAllocator};
pub use generic::GenericParser;
pub use remoteok::RemoteOkParser;
pub use remotive::RemotiveParser;
pub use workingnomads::WorkingNomadsParser;

/// A site-specific extractor.
///
/// Contract: never panic on malformed input, try prioritized selectors per
/// field, and assign a stable unique `id` for every emitted job.
pub trait SiteParser: Send + Sync {
    /// The `parser_id` this parser registers under.
    fn id(&self) -> &'static str;

    fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job>;
}

/// Maps `parser_id` to its parser. Unknown IDs fall back to the generic
/// parser so a misconfigured source degrades to best-effort extraction
/// instead of producing nothing.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Box<dyn SiteParser>>,
    fallback: GenericParser,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_parsers()
    }
}

impl ParserRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
            fallback: GenericParser,
        }
    }

    /// Registry pre-loaded with every built-in site parser.
    #[must_use]
    pub fn with_default_parsers() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(RemotiveParser));
        registry.register(Box::new(RemoteOkParser));
        registry.register(Box::new(WorkingNomadsParser));
        registry.register(Box::new(GenericParser));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn SiteParser>) {
        self.parsers.insert(parser.id(), parser);
    }

    /// Whether a `parser_id` resolves to a registered parser.
    #[must_use]
    pub fn contains(&self, parser_id: &str) -> bool {
        self.parsers.contains_key(parser_id)
    }

    /// Parse a document for a feed, routing by the feed's `parser_id`.
    #[must_use]
    pub fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job> {
        let parser: &dyn SiteParser = match feed.parser_id.as_deref() {
            Some(id) => match self.parsers.get(id) {
                Some(p) => p.as_ref(),
                None => {
                    warn!(parser_id = id, feed = %feed.name, "unknown parser id, using generic");
                    &self.fallback
                }
            },
            None => &self.fallback,
        };

        let jobs = parser.parse(doc, feed);
        info!(feed = %feed.name, parser = parser.id(), count = jobs.len(), "parsed jobs");
        jobs
    }
}
