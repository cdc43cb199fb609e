//! Field extraction combinators shared by the site parsers
//!
//! Sites redesign constantly, so every field is read through a prioritized
//! list of selectors: the first one producing a non-empty value wins.
//! Selector churn then stays local to one list instead of rippling through
//! a parser.

use std::collections::HashSet;

use scraper::{ElementRef, Selector};
use xxhash_rust::xxh3::xxh3_64;

/// Text of the first selector that matches with non-empty content.
#[must_use]
pub fn first_text(el: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for source in selectors {
        let Ok(selector) = Selector::parse(source) else {
            continue;
        };
        if let Some(found) = el.select(&selector).next() {
            let text = collapse(&found.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First non-empty attribute value across `(selector, attribute)` pairs.
#[must_use]
pub fn first_attr(el: ElementRef<'_>, sources: &[(&str, &str)]) -> Option<String> {
    for (source, attr) in sources {
        let Ok(selector) = Selector::parse(source) else {
            continue;
        };
        if let Some(found) = el.select(&selector).next() {
            if let Some(value) = found.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Attribute of the element itself.
#[must_use]
pub fn own_attr(el: ElementRef<'_>, attr: &str) -> Option<String> {
    el.value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Stable 16-hex-digit content hash for a job block with no usable URL.
///
/// The ordinal keeps identically-rendered blocks on the same page apart.
#[must_use]
pub fn content_hash_id(title: &str, company: &str, ordinal: usize) -> String {
    let digest = xxh3_64(format!("{title}|{company}|{ordinal}").as_bytes());
    hex::encode(digest.to_be_bytes())
}

/// Enforces pairwise-distinct IDs within one parsed page.
///
/// A colliding candidate gets an `_N` suffix with the smallest integer
/// that restores uniqueness.
#[derive(Default)]
pub struct IdAllocator {
    seen: HashSet<String>,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, candidate: String) -> String {
        if self.seen.insert(candidate.clone()) {
            return candidate;
        }
        let mut n = 1usize;
        loop {
            let suffixed = format!("{candidate}_{n}");
            if self.seen.insert(suffixed.clone()) {
                return suffixed;
            }
            n += 1;
        }
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
