//! Fallback parser for unknown or board-style markup

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::model::{Feed, Job};
use crate::utils::resolve_url;

use super::extract::{content_hash_id, first_attr, first_text, IdAllocator};
use super::SiteParser;

/// Container selectors tried in order; the first that yields jobs wins.
const CARD_SELECTORS: &[&str] = &[
    ".job",
    ".job-item",
    ".job-listing",
    ".job-card",
    "job-card",
    ".position",
    ".vacancy",
    ".listing",
    "article",
    ".post",
    ".entry",
];

const TITLE_SELECTORS: &[&str] = &["h1", "h2", "h3", ".title", ".job-title", "a"];
const COMPANY_SELECTORS: &[&str] = &[".company", ".company-name", ".employer"];
const LOCATION_SELECTORS: &[&str] = &[".location", ".job-location"];

/// Best-effort extractor used when no site parser claims the source.
pub struct GenericParser;

impl SiteParser for GenericParser {
    fn id(&self) -> &'static str {
        "generic"
    }

    fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job> {
        for source in CARD_SELECTORS {
            let Ok(selector) = Selector::parse(source) else {
                continue;
            };
            let cards: Vec<_> = doc.select(&selector).collect();
            if cards.is_empty() {
                continue;
            }
            debug!(selector = source, count = cards.len(), "generic parser found candidate cards");

            let mut jobs = Vec::new();
            let mut ids = IdAllocator::new();

            for (ordinal, card) in cards.iter().enumerate() {
                let Some(title) = first_text(*card, TITLE_SELECTORS) else {
                    continue;
                };
                let company = first_text(*card, COMPANY_SELECTORS)
                    .unwrap_or_else(|| "Unknown Company".to_string());

                let url = first_attr(*card, &[("a", "href")])
                    .map(|href| resolve_url(&feed.url, &href))
                    .unwrap_or_default();

                let id = if url.is_empty() {
                    content_hash_id(&title, &company, ordinal)
                } else {
                    url.clone()
                };

                let mut job = Job::new(ids.assign(id), title, company, url, &feed.name);
                if let Some(location) = first_text(*card, LOCATION_SELECTORS) {
                    job.location = location;
                }
                if job.is_valid() {
                    jobs.push(job);
                }
            }

            if !jobs.is_empty() {
                return jobs;
            }
        }

        warn!(feed = %feed.name, "generic parser found no job-like elements");
        Vec::new()
    }
}
