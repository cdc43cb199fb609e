//! Normalized job posting record
//!
//! A `Job` is produced by a parser, mutated only by the ingestion pipeline
//! before persistence, and afterwards immutable except for `last_seen`
//! refresh on re-observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized job posting.
///
/// Identity is the `id` field: two jobs with equal `id` are the same
/// entity, and downstream persistence treats equal-`id` records as upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier. Site-native where available, otherwise the URL,
    /// otherwise a 16-hex-digit content hash assigned by the parser.
    pub id: String,
    pub title: String,
    pub company: String,
    /// Link to the posting. Empty string when the source exposes none
    /// (then `id` is a content hash).
    pub url: String,
    /// Name of the configured source this job came from.
    pub source: String,

    /// Raw date string exactly as the source published it. Kept verbatim
    /// so nothing is lost when `posted_at` parsing fails.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub salary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub experience_level: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a job with the required fields; optional fields start empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            url: url.into(),
            source: source.into(),
            date: String::new(),
            location: String::new(),
            salary: String::new(),
            job_type: String::new(),
            experience_level: String::new(),
            is_remote: false,
            description: String::new(),
            skills: Vec::new(),
            posted_at: None,
            last_seen: None,
            expires: None,
        }
    }

    /// Whether the required fields hold non-empty values after trimming.
    ///
    /// Parsers check this before emitting; the pipeline drops anything
    /// that slips through.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.title.trim().is_empty()
            && !self.company.trim().is_empty()
    }

    /// Check whether this job should be considered expired.
    ///
    /// An explicit `expires` timestamp is authoritative in both
    /// directions: a future `expires` keeps the job fresh regardless of
    /// `last_seen`. Without one, the job expires when `last_seen` (or,
    /// absent that, `posted_at`) is older than `max_age_days`. A job with
    /// no timestamps at all is never expired.
    #[must_use]
    pub fn is_expired(&self, max_age_days: i64) -> bool {
        let now = Utc::now();

        if let Some(expires) = self.expires {
            return now > expires;
        }

        if let Some(last_seen) = self.last_seen {
            return (now - last_seen).num_days() > max_age_days;
        }

        if let Some(posted_at) = self.posted_at {
            return (now - posted_at).num_days() > max_age_days;
        }

        false
    }

    /// Refresh `last_seen` on re-observation of an already-known posting.
    pub fn touch(&mut self) {
        self.last_seen = Some(Utc::now());
    }
}
