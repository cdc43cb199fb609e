//! Parser for workingnomads.com listing cards

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::model::{Feed, Job};
use crate::utils::resolve_url;

use super::extract::{first_attr, first_text, IdAllocator};
use super::SiteParser;

const CARD_SELECTORS: &[&str] = &[
    "div.job-card",
    "div.job-listing",
    "div.job-item",
    "article.job",
    "div.job-wrapper",
    "div.job-post",
    "li.job",
    "tr.job",
];

const TITLE_SELECTORS: &[&str] = &["h3", "h2", "h4", ".job-title", ".title", "strong", "b"];
const COMPANY_SELECTORS: &[&str] = &[".company", ".company-name", ".employer"];
const LOCATION_SELECTORS: &[&str] = &[".location", ".job-location"];

pub struct WorkingNomadsParser;

impl SiteParser for WorkingNomadsParser {
    fn id(&self) -> &'static str {
        "workingnomads"
    }

    fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job> {
        let mut cards: Vec<ElementRef<'_>> = Vec::new();
        for source in CARD_SELECTORS {
            let Ok(selector) = Selector::parse(source) else {
                continue;
            };
            cards = doc.select(&selector).collect();
            if !cards.is_empty() {
                break;
            }
        }

        if cards.is_empty() {
            warn!(feed = %feed.name, "no workingnomads job cards found");
            return Vec::new();
        }

        let mut jobs = Vec::new();
        let mut ids = IdAllocator::new();

        for card in cards {
            if !might_be_job_card(card) {
                continue;
            }

            let Some(title) = first_text(card, TITLE_SELECTORS) else {
                continue;
            };
            // Very short "titles" are navigation noise, not postings.
            if title.len() <= 3 {
                continue;
            }

            let company = first_text(card, COMPANY_SELECTORS)
                .unwrap_or_else(|| "Unknown Company".to_string());
            let url = first_attr(card, &[("a", "href")])
                .map(|href| resolve_url("https://www.workingnomads.com", &href))
                .unwrap_or_default();

            let id = if url.is_empty() { title.clone() } else { url.clone() };

            let mut job = Job::new(ids.assign(id), title, company, url, &feed.name);
            if let Some(location) = first_text(card, LOCATION_SELECTORS) {
                job.location = location;
            }
            job.is_remote = true;
            if job.is_valid() {
                jobs.push(job);
            }
        }

        jobs
    }
}

/// Content heuristic keeping obvious non-job blocks (navigation, footers)
/// out of the fallback card sets.
fn might_be_job_card(card: ElementRef<'_>) -> bool {
    let text = card.text().collect::<String>().to_lowercase();
    const INDICATORS: &[&str] = &[
        "remote", "job", "position", "developer", "engineer", "manager", "apply",
        "analyst", "specialist", "coordinator",
    ];
    const EXCLUDED: &[&str] = &["cookie", "privacy", "navigation", "footer", "powered by"];

    text.len() > 50
        && INDICATORS.iter().any(|i| text.contains(i))
        && !EXCLUDED.iter().any(|e| text.contains(e))
}
