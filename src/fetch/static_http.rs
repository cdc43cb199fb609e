//! Static transports: RSS, JSON and plain HTML over HTTP(S)

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use scraper::Html;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::{Feed, Job};
use crate::parsers::ParserRegistry;
use crate::utils::constants::{CHROME_USER_AGENT, STATIC_HTTP_TIMEOUT};
use crate::utils::resolve_url;

/// JSON object keys that may hold the listing array, tried in order.
const LISTING_KEYS: &[&str] = &["jobs", "results", "items", "data", "listings"];

const ID_KEYS: &[&str] = &["id", "job_id", "slug"];
const TITLE_KEYS: &[&str] = &["title", "name", "position"];
const COMPANY_KEYS: &[&str] = &["company", "company_name", "employer"];
const URL_KEYS: &[&str] = &["url", "link", "apply_url"];
const DATE_KEYS: &[&str] = &["date", "published_at", "created_at"];
const LOCATION_KEYS: &[&str] = &["location", "candidate_required_location"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary"];

/// Fetches rss/json/html feeds over plain HTTP.
pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(STATIC_HTTP_TIMEOUT)
            .user_agent(CHROME_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET the feed URL with its configured headers and cookies.
    async fn get(&self, feed: &Feed) -> Result<String, FetchError> {
        let mut request = self.client.get(&feed.url);
        for (name, value) in &feed.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !feed.cookies.is_empty() {
            let cookie_header = feed
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header("Cookie", cookie_header);
        }

        let response = request.send().await?;
        if let Some(err) = FetchError::from_status(response.status().as_u16()) {
            return Err(err);
        }
        Ok(response.text().await?)
    }

    /// Fetch an RSS/Atom feed and emit one job per entry.
    ///
    /// Company resolution tries the entry author first and falls back to
    /// the channel title.
    pub async fn fetch_rss(&self, feed: &Feed) -> Result<Vec<Job>, FetchError> {
        let body = self.get(feed).await?;
        let parsed = feed_rs::parser::parse(body.as_bytes())
            .map_err(|e| FetchError::Malformed(format!("feed parse error: {e}")))?;

        let channel_title = parsed
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        info!(feed = %feed.name, entries = parsed.entries.len(), "parsed rss feed");

        let mut jobs = Vec::new();
        for entry in parsed.entries {
            let title = match entry.title {
                Some(t) if !t.content.trim().is_empty() => t.content,
                _ => {
                    warn!(feed = %feed.name, "skipping rss entry without title");
                    continue;
                }
            };

            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();

            let company = entry
                .authors
                .iter()
                .map(|a| a.name.trim())
                .find(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| channel_title.clone());

            let id = if entry.id.is_empty() {
                url.clone()
            } else {
                entry.id
            };
            if id.is_empty() {
                warn!(feed = %feed.name, title, "skipping rss entry without id or link");
                continue;
            }

            let posted_at = entry.published.or(entry.updated);

            let mut job = Job::new(id, title, company, url, &feed.name);
            job.posted_at = posted_at;
            job.date = posted_at.map(|d| d.to_rfc3339()).unwrap_or_default();
            if let Some(summary) = entry.summary {
                job.description = summary.content;
            }
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// Fetch a JSON feed from HTTP or a local file.
    pub async fn fetch_json(&self, feed: &Feed) -> Result<Vec<Job>, FetchError> {
        let body = if Path::new(&feed.url).is_file() {
            std::fs::read_to_string(&feed.url)
                .map_err(|e| FetchError::Malformed(format!("failed to read {}: {e}", feed.url)))?
        } else {
            self.get(feed).await?
        };

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed(format!("invalid JSON: {e}")))?;

        let entries = match &data {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => {
                let mut found: Option<&Vec<Value>> = None;
                for key in LISTING_KEYS {
                    if let Some(Value::Array(items)) = map.get(*key) {
                        found = Some(items);
                        break;
                    }
                }
                match found {
                    Some(items) => items.as_slice(),
                    None => {
                        warn!(feed = %feed.name, "no job array found in JSON response");
                        return Ok(Vec::new());
                    }
                }
            }
            _ => {
                return Err(FetchError::Malformed(
                    "JSON root is neither array nor object".to_string(),
                ))
            }
        };

        info!(feed = %feed.name, entries = entries.len(), "parsed json feed");

        let mut jobs = Vec::new();
        for entry in entries {
            let Some(title) = first_string(entry, TITLE_KEYS) else {
                warn!(feed = %feed.name, "skipping json entry without title");
                continue;
            };

            let mut url = first_string(entry, URL_KEYS).unwrap_or_default();
            if !url.is_empty() && !url.starts_with("http") {
                url = resolve_url(&feed.url, &url);
            }

            let company = first_string(entry, COMPANY_KEYS)
                .unwrap_or_else(|| "Unknown Company".to_string());

            let id = first_string(entry, ID_KEYS)
                .filter(|s| !s.is_empty())
                .or_else(|| (!url.is_empty()).then(|| url.clone()))
                .unwrap_or_else(|| title.clone());

            let mut job = Job::new(id, title, company, url, &feed.name);
            if let Some(raw_date) = first_string(entry, DATE_KEYS) {
                job.posted_at = parse_date_lenient(&raw_date);
                job.date = raw_date;
            }
            if let Some(location) = first_string(entry, LOCATION_KEYS) {
                job.location = location;
            }
            if let Some(description) = first_string(entry, DESCRIPTION_KEYS) {
                job.description = description;
            }
            if let Some(Value::Bool(remote)) = entry.get("remote").or_else(|| entry.get("is_remote")) {
                job.is_remote = *remote;
            }
            debug!(title = %job.title, company = %job.company, "parsed json job");
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// Fetch an HTML page and dispatch it to the parser registry.
    pub async fn fetch_html(
        &self,
        feed: &Feed,
        registry: &ParserRegistry,
    ) -> Result<Vec<Job>, FetchError> {
        let body = self.get(feed).await?;
        let doc = Html::parse_document(&body);
        Ok(registry.parse(&doc, feed))
    }
}

/// First key whose value is a non-empty string (numbers are accepted and
/// stringified, since sites disagree on ID types).
fn first_string(entry: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match entry.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Lenient date parsing: ISO-8601 preferred, falling back to RFC 2822 and
/// bare dates. Callers keep the raw string when all of these fail.
fn parse_date_lenient(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_dates() {
        assert!(parse_date_lenient("2025-06-01T10:30:00Z").is_some());
        assert!(parse_date_lenient("Sun, 01 Jun 2025 10:30:00 +0000").is_some());
        assert!(parse_date_lenient("2025-06-01").is_some());
        assert!(parse_date_lenient("next Tuesday").is_none());
    }

    #[test]
    fn first_string_accepts_numbers() {
        let entry = serde_json::json!({"id": 42, "title": "Support Agent"});
        assert_eq!(first_string(&entry, ID_KEYS).as_deref(), Some("42"));
        assert_eq!(first_string(&entry, TITLE_KEYS).as_deref(), Some("Support Agent"));
    }
}
