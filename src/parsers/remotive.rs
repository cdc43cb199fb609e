//! Parser for remotive.com job tiles (2024 markup)

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::model::{Feed, Job};

use super::extract::{own_attr, IdAllocator};
use super::SiteParser;

/// Location keywords this feed is allowed to surface. Tiles with location
/// tags matching none of these are dropped; tiles without location tags
/// pass.
const ALLOWED_LOCATION_KEYWORDS: &[&str] = &[
    "worldwide",
    "global",
    "remote",
    "anywhere",
    "usa",
    "uk",
    "canada",
    "india",
    "emea",
    "apac",
    "thailand",
    "south africa",
    "philippines",
    "netherlands",
    "spain",
    "australia",
];

/// Category tags that keep a tile. Remotive mixes every vertical on one
/// page, so the parser keeps only customer-service roles for this feed.
const ALLOWED_CATEGORIES: &[&str] = &["customer service", "customer support"];

pub struct RemotiveParser;

impl SiteParser for RemotiveParser {
    fn id(&self) -> &'static str {
        "remotive"
    }

    fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job> {
        let Ok(card_selector) = Selector::parse("div.job-tile") else {
            return Vec::new();
        };
        let link_selector = Selector::parse("a.remotive-url-visit").ok();
        let span_selector = Selector::parse("span").ok();
        let category_selector = Selector::parse("span.job-tile-category a").ok();
        let location_selector = Selector::parse("span.job-tile-location").ok();

        let cards: Vec<_> = doc.select(&card_selector).collect();
        if cards.is_empty() {
            warn!(feed = %feed.name, "no remotive job tiles found; markup may have changed");
            return Vec::new();
        }

        let mut jobs = Vec::new();
        let mut ids = IdAllocator::new();

        for card in cards {
            let Some(link_sel) = &link_selector else { break };
            let Some(link) = card.select(link_sel).next() else {
                continue;
            };

            // The visit link renders as spans: title, a "•" separator, then
            // the company name.
            let spans: Vec<String> = span_selector
                .as_ref()
                .map(|sel| {
                    link.select(sel)
                        .map(|s| s.text().collect::<String>().trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let Some(title) = spans.first().cloned() else {
                continue;
            };
            let company = spans
                .iter()
                .skip(1)
                .find(|t| t.as_str() != "•")
                .cloned()
                .unwrap_or_else(|| "Unknown Company".to_string());

            let mut url = own_attr(link, "href").unwrap_or_default();
            if url.starts_with('/') {
                url = format!("https://remotive.com{url}");
            }

            let categories: Vec<String> = category_selector
                .as_ref()
                .map(|sel| {
                    card.select(sel)
                        .map(|a| a.text().collect::<String>().trim().to_lowercase())
                        .collect()
                })
                .unwrap_or_default();
            let has_customer = categories
                .iter()
                .any(|cat| ALLOWED_CATEGORIES.iter().any(|allowed| cat.contains(allowed)));
            if !has_customer {
                debug!(title = %title, "remotive tile dropped: not a customer-service category");
                continue;
            }

            let locations: Vec<String> = location_selector
                .as_ref()
                .map(|sel| {
                    card.select(sel)
                        .map(|s| s.text().collect::<String>().trim().to_lowercase())
                        .collect()
                })
                .unwrap_or_default();
            let location_ok = locations.is_empty()
                || locations.iter().any(|loc| {
                    ALLOWED_LOCATION_KEYWORDS.iter().any(|kw| loc.contains(kw))
                });
            if !location_ok {
                debug!(title = %title, "remotive tile dropped: disallowed location");
                continue;
            }

            let id = if url.is_empty() {
                title.clone()
            } else {
                url.rsplit('/').next().unwrap_or(&url).to_string()
            };

            let mut job = Job::new(ids.assign(id), title, company, url, &feed.name);
            if let Some(location) = locations.first() {
                job.location = location.clone();
            }
            job.is_remote = true;
            if job.is_valid() {
                jobs.push(job);
            }
        }

        jobs
    }
}
