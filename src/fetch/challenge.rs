//! Anti-bot challenge detection and mitigation
//!
//! Detection is a pure function over the rendered DOM so it can be tested
//! without a browser. Mitigation is conservative: wait out transient
//! interstitials, click an obvious continue button once, give up. No
//! CAPTCHA solving is attempted.

use std::time::Duration;

use chromiumoxide::Page;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

/// URL fragments that mark a challenge iframe, form action or script.
static CHALLENGE_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(captcha|recaptcha|hcaptcha|challenge|cloudflare|imperva|distil|akamai)")
        .expect("valid regex")
});

/// Phrases in the title or body that mark a challenge page.
const CHALLENGE_TEXT_MARKERS: &[&str] = &[
    "just a moment",
    "checking your browser",
    "security check",
    "captcha",
    "prove you are human",
    "verify you are human",
    "robot check",
    "unusual traffic",
    "cloudflare",
    "access denied",
];

/// Markers of a Cloudflare-style interstitial that tends to clear itself.
const TRANSIENT_MARKERS: &[&str] = &["just a moment", "checking your browser", "cloudflare"];

/// Whether a rendered page is an anti-bot challenge.
#[must_use]
pub fn detect(doc: &Html) -> bool {
    for (selector_src, attr) in [
        ("iframe", "src"),
        ("form", "action"),
        ("script", "src"),
    ] {
        let Ok(selector) = Selector::parse(selector_src) else {
            continue;
        };
        for el in doc.select(&selector) {
            if let Some(value) = el.value().attr(attr) {
                if CHALLENGE_URL_PATTERN.is_match(value) {
                    debug!(element = selector_src, value, "challenge pattern in attribute");
                    return true;
                }
            }
        }
    }

    let text = page_text(doc);
    for marker in CHALLENGE_TEXT_MARKERS {
        if text.contains(marker) {
            debug!(marker, "challenge marker in page text");
            return true;
        }
    }

    false
}

/// Detection over a raw HTML string.
#[must_use]
pub fn detect_str(html: &str) -> bool {
    detect(&Html::parse_document(html))
}

/// Whether the page looks like a self-clearing interstitial.
fn is_transient(html: &str) -> bool {
    let lower = html.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

fn page_text(doc: &Html) -> String {
    let mut text = String::new();
    if let Ok(title_sel) = Selector::parse("title") {
        for t in doc.select(&title_sel) {
            text.push_str(&t.text().collect::<String>());
            text.push(' ');
        }
    }
    if let Ok(body_sel) = Selector::parse("body") {
        for b in doc.select(&body_sel) {
            text.push_str(&b.text().collect::<String>());
        }
    }
    text.to_lowercase()
}

async fn current_html(page: &Page) -> Option<String> {
    match page.content().await {
        Ok(html) => Some(html),
        Err(e) => {
            warn!(error = %e, "failed to read page content during mitigation");
            None
        }
    }
}

/// Try to clear a detected challenge. Returns true when a re-check no
/// longer detects one.
///
/// Policy: Cloudflare-style interstitials get up to 10s to clear on their
/// own; a visible continue/proceed/verify/submit button is clicked once;
/// otherwise one final 15s wait, then give up.
pub async fn mitigate(page: &Page) -> bool {
    let Some(html) = current_html(page).await else {
        return false;
    };

    if is_transient(&html) {
        info!("transient interstitial detected, waiting for it to clear");
        tokio::time::sleep(Duration::from_secs(10)).await;
        if let Some(html) = current_html(page).await {
            if !detect_str(&html) {
                info!("interstitial cleared on its own");
                return true;
            }
        }
    }

    if click_continue_button(page).await {
        tokio::time::sleep(Duration::from_secs(3)).await;
        if let Some(html) = current_html(page).await {
            if !detect_str(&html) {
                info!("challenge cleared by continue button");
                return true;
            }
        }
    }

    info!("waiting once more for challenge to resolve");
    tokio::time::sleep(Duration::from_secs(15)).await;
    match current_html(page).await {
        Some(html) => !detect_str(&html),
        None => false,
    }
}

/// Click the first visible button-like element whose text suggests it
/// advances past the challenge. Returns whether anything was clicked.
async fn click_continue_button(page: &Page) -> bool {
    const CLICK_SCRIPT: &str = r#"
        (() => {
            const words = ['continue', 'proceed', 'verify', 'submit'];
            const els = document.querySelectorAll('button, input[type="submit"], a');
            for (const el of els) {
                const text = (el.innerText || el.value || '').trim().toLowerCase();
                if (text && words.some((w) => text.includes(w))) {
                    el.click();
                    return true;
                }
            }
            return false;
        })()
    "#;

    match page.evaluate(CLICK_SCRIPT).await {
        Ok(result) => {
            let clicked = result.into_value::<bool>().unwrap_or(false);
            if clicked {
                info!("clicked continue button on challenge page");
            }
            clicked
        }
        Err(e) => {
            debug!(error = %e, "continue-button probe failed");
            false
        }
    }
}
