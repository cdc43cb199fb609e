//! Parser for remoteok.io table-row listings

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::model::{Feed, Job};

use super::extract::{first_attr, first_text, own_attr, IdAllocator};
use super::SiteParser;

pub struct RemoteOkParser;

impl SiteParser for RemoteOkParser {
    fn id(&self) -> &'static str {
        "remoteok"
    }

    fn parse(&self, doc: &Html, feed: &Feed) -> Vec<Job> {
        let Ok(row_selector) = Selector::parse("tr.job") else {
            return Vec::new();
        };
        let tag_selector = Selector::parse(".tags .tag").ok();

        let rows: Vec<_> = doc.select(&row_selector).collect();
        if rows.is_empty() {
            warn!(feed = %feed.name, "no remoteok job rows found");
            return Vec::new();
        }
        debug!(count = rows.len(), "found remoteok job rows");

        let mut jobs = Vec::new();
        let mut ids = IdAllocator::new();

        for row in rows {
            let Some(title) = first_text(row, &[".company h2", "h2"]) else {
                continue;
            };
            let company = first_text(row, &[".company h3", "h3"])
                .unwrap_or_else(|| "Remote Company".to_string());

            let mut url = first_attr(row, &[("td.company a", "href"), ("a", "href")])
                .unwrap_or_default();
            if url.starts_with('/') {
                url = format!("https://remoteok.io{url}");
            }

            let id = own_attr(row, "data-id").unwrap_or_else(|| url.clone());
            if id.is_empty() {
                continue;
            }

            let mut job = Job::new(ids.assign(id), title, company, url, &feed.name);
            if let Some(tag_sel) = &tag_selector {
                job.skills = row
                    .select(tag_sel)
                    .map(|t| t.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            job.is_remote = true;
            if job.is_valid() {
                jobs.push(job);
            }
        }

        jobs
    }
}
