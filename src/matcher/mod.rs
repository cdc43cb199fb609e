//! Interest filter: classify jobs against a keyword taxonomy
//!
//! Each category carries a list of phrase keywords. A job is relevant
//! when the number of distinct matching patterns across active categories
//! reaches the minimum score, unless an exclude pattern fires first, in
//! which case the job scores zero everywhere.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::model::Job;

/// Component words of multi-word phrases that may contribute standalone
/// patterns. Keeps common words like "engineer" or "analyst" from
/// inflating matches.
const ALLOWED_COMPONENT_WORDS: &[&str] = &[
    "support",
    "customer",
    "compliance",
    "operations",
    "implementation",
    "onboarding",
];

/// Patterns that zero out a job's score across all categories.
const EXCLUDE_KEYWORDS: &[&str] = &[
    "software engineer",
    "software developer",
    "full stack",
    "frontend",
    "backend",
    "devops",
    "data scientist",
    "machine learning",
    "ai engineer",
    "web developer",
    "mobile developer",
    "ios developer",
    "android developer",
    "ui/ux designer",
    "product manager",
    "project manager",
    "scrum master",
    "engineering manager",
];

/// A named category and its phrase keywords.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub phrases: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, phrases: &[&str]) -> Self {
        Self {
            name: name.into(),
            phrases: phrases.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// The default taxonomy of roles the operator is interested in.
#[must_use]
pub fn default_taxonomy() -> Vec<Category> {
    vec![
        Category::new(
            "customer_support",
            &[
                "customer service",
                "customer support",
                "customer experience",
                "customer operations",
                "client services",
                "customer happiness",
                "client relations",
                "customer success",
                "customer advocate",
                "customer onboarding",
                "customer solutions",
            ],
        ),
        Category::new(
            "support_roles",
            &[
                "support",
                "support specialist",
                "support representative",
                "support analyst",
                "support technician",
                "customer care",
            ],
        ),
        Category::new(
            "technical_support",
            &[
                "technical support",
                "product support",
                "support engineer",
                "application support",
                "it support",
                "escalation support",
                "helpdesk technician",
                "helpdesk",
                "technical account manager",
                "l1 support",
                "l2 support",
                "l3 support",
            ],
        ),
        Category::new(
            "specialist_roles",
            &[
                "integration specialist",
                "onboarding specialist",
                "client implementation",
                "implementation engineer",
                "solutions engineer",
                "partner solutions",
                "pre-sales engineer",
                "technical account manager",
                "account manager",
            ],
        ),
        Category::new(
            "compliance_analysis",
            &[
                "aml analyst",
                "compliance analyst",
                "fraud analyst",
                "transaction monitoring",
                "compliance operations",
                "financial crime analyst",
                "risk compliance officer",
                "crypto compliance",
                "kyc analyst",
                "edd analyst",
                "compliance officer",
                "risk officer",
                "risk analyst",
            ],
        ),
        Category::new(
            "operations",
            &[
                "operations",
                "operations specialist",
                "operations analyst",
                "business operations",
                "client operations",
            ],
        ),
    ]
}

struct CompiledCategory {
    name: String,
    patterns: Vec<Regex>,
}

/// Keyword classifier over `title + company + description`.
pub struct SmartMatcher {
    categories: Vec<CompiledCategory>,
    exclude: Vec<Regex>,
    min_score: usize,
}

impl Default for SmartMatcher {
    fn default() -> Self {
        Self::new(default_taxonomy(), 1)
    }
}

impl SmartMatcher {
    /// Compile a taxonomy. Each phrase contributes a word-boundary
    /// pattern; component words of multi-word phrases contribute their own
    /// pattern only when on the allow-list. Patterns are deduplicated per
    /// category so a keyword is never counted twice.
    #[must_use]
    pub fn new(taxonomy: Vec<Category>, min_score: usize) -> Self {
        let categories = taxonomy
            .into_iter()
            .map(|category| {
                let mut sources: Vec<String> = Vec::new();
                for phrase in &category.phrases {
                    push_unique(&mut sources, phrase);
                    let words: Vec<&str> = phrase.split_whitespace().collect();
                    if words.len() > 1 {
                        for word in words {
                            if word.len() > 4
                                && ALLOWED_COMPONENT_WORDS.contains(&word.to_lowercase().as_str())
                            {
                                push_unique(&mut sources, word);
                            }
                        }
                    }
                }
                CompiledCategory {
                    name: category.name,
                    patterns: sources.iter().map(|s| word_boundary(s)).collect(),
                }
            })
            .collect();

        let exclude = EXCLUDE_KEYWORDS.iter().map(|k| word_boundary(k)).collect();

        Self {
            categories,
            exclude,
            min_score,
        }
    }

    /// Restrict the default taxonomy to a subset of category names.
    #[must_use]
    pub fn with_categories(names: &[&str], min_score: usize) -> Self {
        let taxonomy = default_taxonomy()
            .into_iter()
            .filter(|c| names.contains(&c.name.as_str()))
            .collect();
        Self::new(taxonomy, min_score)
    }

    fn text_to_check(job: &Job) -> String {
        let mut text = format!("{} {}", job.title, job.company);
        if !job.description.is_empty() {
            text.push(' ');
            text.push_str(&job.description);
        }
        text
    }

    /// Per-category count of distinct matching patterns. All zeros when an
    /// exclude pattern matches.
    #[must_use]
    pub fn match_scores(&self, job: &Job) -> HashMap<String, usize> {
        let text = Self::text_to_check(job);

        for pattern in &self.exclude {
            if pattern.is_match(&text) {
                debug!(title = %job.title, pattern = %pattern.as_str(), "job excluded");
                return self
                    .categories
                    .iter()
                    .map(|c| (c.name.clone(), 0))
                    .collect();
            }
        }

        self.categories
            .iter()
            .map(|category| {
                let score = category
                    .patterns
                    .iter()
                    .filter(|p| p.is_match(&text))
                    .count();
                (category.name.clone(), score)
            })
            .collect()
    }

    /// Whether a job's total score across categories meets the threshold.
    #[must_use]
    pub fn is_relevant(&self, job: &Job) -> bool {
        let scores = self.match_scores(job);
        let total: usize = scores.values().sum();
        total >= self.min_score
    }

    /// Keep only relevant jobs, preserving input order.
    #[must_use]
    pub fn filter(&self, jobs: Vec<Job>) -> Vec<Job> {
        jobs.into_iter().filter(|j| self.is_relevant(j)).collect()
    }
}

fn push_unique(sources: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.to_lowercase();
    if !sources.contains(&candidate) {
        sources.push(candidate);
    }
}

fn word_boundary(phrase: &str) -> Regex {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(phrase)))
        .case_insensitive(true)
        .build()
        .expect("escaped phrase is a valid pattern")
}
