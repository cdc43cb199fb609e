//! Fuzzy duplicate detection for job postings
//!
//! Near-identical listings (same company, trivially-reworded title) are
//! collapsed by normalizing titles and scoring their similarity. Jobs at
//! different companies are never duplicates, whatever their titles.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use similar::TextDiff;
use tracing::debug;

use crate::model::Job;

/// Abbreviation expansions applied during title normalization.
///
/// The table is fixed and ordered; changing it changes which postings
/// collapse together, so entries are only ever appended. `qa` maps to
/// `quality assurance` (single authoritative mapping).
static NORMALIZATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    const TABLE: &[(&str, &str)] = &[
        (r"\bsr\.?\b", "senior"),
        (r"\bjr\.?\b", "junior"),
        (r"\bmgr\.?\b", "manager"),
        (r"\beng\.?\b", "engineer"),
        (r"\bdev\.?\b", "developer"),
        (r"\badmin\.?\b", "administrator"),
        (r"\bassoc\.?\b", "associate"),
        (r"\bspec\.?\b", "specialist"),
        (r"\bcoord\.?\b", "coordinator"),
        (r"\btech\.?\b", "technical"),
        (r"\bsw\.?\b", "software"),
        (r"\bhw\.?\b", "hardware"),
        (r"\bqa\.?\b", "quality assurance"),
        (r"\bui\.?\b", "user interface"),
        (r"\bux\.?\b", "user experience"),
        (r"\bapi\.?\b", "application programming interface"),
        (r"\bdb\.?\b", "database"),
        (r"\bsys\.?\b", "system"),
        (r"\bops\.?\b", "operations"),
        (r"\bhr\.?\b", "human resources"),
        (r"\bit\.?\b", "information technology"),
        (r"\bcs\.?\b", "customer service"),
        (r"\bpm\.?\b", "project manager"),
        (r"\bba\.?\b", "business analyst"),
    ];
    TABLE
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("normalization pattern is valid"),
                *replacement,
            )
        })
        .collect()
});

static STOPWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(the|a|an|and|or|at|in|on|for|with|by)\b").expect("valid regex"));

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize a job title for comparison.
///
/// Lowercase and collapse whitespace, expand the abbreviation table,
/// remove stopwords, strip everything but alphanumerics and spaces, and
/// collapse again. Idempotent: normalizing a normalized title is a no-op.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mut normalized = title.to_lowercase();
    normalized = WHITESPACE.replace_all(normalized.trim(), " ").into_owned();

    for (pattern, replacement) in NORMALIZATIONS.iter() {
        normalized = pattern.replace_all(&normalized, *replacement).into_owned();
    }

    normalized = STOPWORDS.replace_all(&normalized, "").into_owned();
    normalized = NON_ALNUM.replace_all(&normalized, "").into_owned();
    normalized = WHITESPACE.replace_all(&normalized, " ").into_owned();

    normalized.trim().to_string()
}

/// Normalize a company name: lowercase and trim only.
#[must_use]
pub fn normalize_company(company: &str) -> String {
    company.trim().to_lowercase()
}

/// Collapses near-duplicate postings, keeping the first occurrence.
pub struct JobDeduplicator {
    similarity_threshold: f64,
}

impl Default for JobDeduplicator {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl JobDeduplicator {
    /// `similarity_threshold` is the minimum title similarity (0..=1) for
    /// two same-company jobs to count as duplicates.
    #[must_use]
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Similarity score between two jobs.
    ///
    /// Zero when the companies differ; otherwise the difflib-style ratio
    /// `2M / (|a| + |b|)` over the normalized titles.
    #[must_use]
    pub fn similarity(&self, a: &Job, b: &Job) -> f64 {
        if normalize_company(&a.company) != normalize_company(&b.company) {
            return 0.0;
        }
        title_ratio(&normalize_title(&a.title), &normalize_title(&b.title))
    }

    #[must_use]
    pub fn is_duplicate(&self, a: &Job, b: &Job) -> bool {
        self.similarity(a, b) >= self.similarity_threshold
    }

    /// All duplicate pairs in a batch, as `(i, j, similarity)` index pairs
    /// with `i < j`.
    #[must_use]
    pub fn find_duplicates(&self, jobs: &[Job]) -> Vec<(usize, usize, f64)> {
        let mut pairs = Vec::new();
        for i in 0..jobs.len() {
            for j in (i + 1)..jobs.len() {
                let score = self.similarity(&jobs[i], &jobs[j]);
                if score >= self.similarity_threshold {
                    pairs.push((i, j, score));
                }
            }
        }
        pairs
    }

    /// Remove duplicates from a batch, keeping the first occurrence of
    /// each duplicate class and preserving input order.
    ///
    /// Seen jobs are bucketed by normalized company: cross-company pairs
    /// score zero, so skipping them changes nothing observable over the
    /// naive pairwise scan.
    #[must_use]
    pub fn deduplicate(&self, jobs: Vec<Job>) -> Vec<Job> {
        let mut unique = Vec::with_capacity(jobs.len());
        let mut seen_titles: HashMap<String, Vec<String>> = HashMap::new();

        for job in jobs {
            let company_key = normalize_company(&job.company);
            let title_key = normalize_title(&job.title);

            let bucket = seen_titles.entry(company_key).or_default();
            let duplicate = bucket
                .iter()
                .any(|seen| title_ratio(seen, &title_key) >= self.similarity_threshold);

            if duplicate {
                debug!(title = %job.title, company = %job.company, "dropping fuzzy duplicate");
            } else {
                bucket.push(title_key);
                unique.push(job);
            }
        }

        unique
    }
}

/// Difflib-equivalent sequence ratio over two normalized titles.
fn title_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_idempotent() {
        let titles = [
            "Sr. Software Eng.",
            "QA Engineer (Remote)",
            "Customer Support — The Night Shift",
            "Ops & IT Coordinator",
        ];
        for title in titles {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once, "title: {title}");
        }
    }

    #[test]
    fn expands_abbreviations() {
        assert_eq!(
            normalize_title("Sr. Software Engineer"),
            normalize_title("Senior Software Engineer")
        );
        assert_eq!(normalize_title("QA Lead"), "quality assurance lead");
    }

    #[test]
    fn strips_stopwords_and_punctuation() {
        assert_eq!(
            normalize_title("Manager of the Support Team, EMEA!"),
            "manager of support team emea"
        );
    }
}
