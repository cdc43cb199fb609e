//! Headless fetching for JS-rendered boards
//!
//! Drives a pooled per-domain browser context through navigate → challenge
//! check → humanized interaction → load-more → extract, then hands the
//! final DOM to the parser registry. Pages are closed after each fetch;
//! the context (and its cookies) stays pooled.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::GetCookiesParams;
use chromiumoxide::Page;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::browser::cookies::CookieRecord;
use crate::browser::BrowserPool;
use crate::error::FetchError;
use crate::model::{Feed, Job};
use crate::parsers::ParserRegistry;
use crate::utils::constants::COOKIE_SAVE_TIMEOUT;
use crate::utils::extract_domain;

use super::challenge;

/// Fetches JS-rendered sources through the browser pool.
pub struct HeadlessFetcher {
    pool: Arc<BrowserPool>,
    registry: Arc<ParserRegistry>,
}

impl HeadlessFetcher {
    #[must_use]
    pub fn new(pool: Arc<BrowserPool>, registry: Arc<ParserRegistry>) -> Self {
        Self { pool, registry }
    }

    pub async fn fetch(&self, feed: &Feed) -> Result<Vec<Job>, FetchError> {
        let domain = extract_domain(&feed.url)
            .ok_or_else(|| FetchError::Config(format!("feed url has no host: {}", feed.url)))?;
        let profile = feed.profile();

        let context = self.pool.get_context(&domain, &feed.cookies).await?;
        let page = context.new_page().await?;

        let result = self.fetch_on_page(&page, feed, profile.navigation_timeout()).await;

        // Persist whatever session state this fetch produced, then close
        // the page. Both are best-effort; the fetch result stands either
        // way.
        if result.is_ok() {
            self.persist_page_cookies(&domain, &page).await;
        }
        if let Err(e) = page.close().await {
            debug!(domain, error = %e, "page close failed");
        }

        result
    }

    async fn fetch_on_page(
        &self,
        page: &Page,
        feed: &Feed,
        nav_timeout: Duration,
    ) -> Result<Vec<Job>, FetchError> {
        if let Err(e) = crate::browser::stealth::inject(page).await {
            warn!(feed = %feed.name, error = %e, "stealth injection failed, continuing");
        }
        if !feed.headers.is_empty() {
            apply_headers(page, feed).await;
        }

        info!(feed = %feed.name, url = %feed.url, "navigating");
        navigate(page, &feed.url, nav_timeout).await?;

        // Challenge check over the parsed DOM. The document must not be
        // held across an await, so each check runs in its own scope.
        let html = page_content(page).await?;
        if challenge::detect_str(&html) {
            warn!(feed = %feed.name, "anti-bot challenge detected");
            if !challenge::mitigate(page).await {
                return Err(FetchError::Challenge);
            }
            info!(feed = %feed.name, "challenge cleared");
        }

        humanize(page).await;
        click_load_more(page).await;

        let html = page_content(page).await?;
        let jobs = {
            let doc = Html::parse_document(&html);
            self.registry.parse(&doc, feed)
        };

        Ok(jobs)
    }

    /// Read the page's cookies and queue them for persistence through the
    /// pool's writer task.
    async fn persist_page_cookies(&self, domain: &str, page: &Page) {
        let snapshot = tokio::time::timeout(
            COOKIE_SAVE_TIMEOUT,
            page.execute(GetCookiesParams::default()),
        )
        .await;

        match snapshot {
            Ok(Ok(result)) => {
                let cookies: Vec<CookieRecord> =
                    result.cookies.iter().map(CookieRecord::from_cdp).collect();
                self.pool.persist_cookies(domain, cookies);
            }
            Ok(Err(e)) => debug!(domain, error = %e, "cookie read failed"),
            Err(_) => debug!(domain, "cookie read timed out"),
        }
    }
}

/// Navigate and wait for the network to settle; on timeout, retry once
/// accepting the DOM as soon as it is loaded.
async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), FetchError> {
    let full_load = async {
        page.goto(url)
            .await
            .map_err(|e| FetchError::Connection(format!("navigation failed: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| FetchError::Connection(format!("navigation wait failed: {e}")))?;
        Ok::<(), FetchError>(())
    };

    match tokio::time::timeout(timeout, full_load).await {
        Ok(result) => result,
        Err(_) => {
            warn!(url, "navigation settle timed out, retrying without waiting for idle");
            match tokio::time::timeout(timeout, page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(FetchError::Connection(format!("navigation failed: {e}"))),
                Err(_) => Err(FetchError::NavigationTimeout(timeout)),
            }
        }
    }
}

async fn page_content(page: &Page) -> Result<String, FetchError> {
    page.content()
        .await
        .map_err(|e| FetchError::Connection(format!("failed to read page content: {e}")))
}

/// Small random value without holding an RNG across an await point.
fn jitter(lo: u64, hi: u64) -> u64 {
    lo + rand::random::<u64>() % (hi - lo)
}

/// A few mouse moves, a partial scroll, a short pause. Best-effort and
/// bounded well under three seconds.
async fn humanize(page: &Page) {
    for _ in 0..(2 + rand::random::<u64>() % 3) {
        let x = jitter(100, 800) as f64;
        let y = jitter(100, 600) as f64;
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build();
        if let Ok(params) = params {
            let _ = page.execute(params).await;
        }
        tokio::time::sleep(Duration::from_millis(jitter(100, 300))).await;
    }

    let scroll_js = format!("window.scrollTo(0, {})", jitter(200, 800));
    let _ = page.evaluate(scroll_js.as_str()).await;
    tokio::time::sleep(Duration::from_millis(jitter(300, 800))).await;
}

/// Click a visible load-more control once and wait for it to settle.
async fn click_load_more(page: &Page) {
    const LOAD_MORE_SCRIPT: &str = r#"
        (() => {
            const texts = ['load more', 'show more'];
            const candidates = document.querySelectorAll(
                'button, a, .load-more, .show-more, [data-testid*="load"]'
            );
            for (const el of candidates) {
                const text = (el.innerText || '').trim().toLowerCase();
                const byClass = el.classList.contains('load-more') || el.classList.contains('show-more');
                if ((byClass || texts.some((t) => text.includes(t))) && el.offsetParent !== null) {
                    el.click();
                    return true;
                }
            }
            return false;
        })()
    "#;

    match page.evaluate(LOAD_MORE_SCRIPT).await {
        Ok(result) => {
            if result.into_value::<bool>().unwrap_or(false) {
                info!("clicked load-more control");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
        Err(e) => debug!(error = %e, "load-more probe failed"),
    }
}

/// Apply the feed's custom headers to this page's requests.
async fn apply_headers(page: &Page, feed: &Feed) {
    use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};

    let map: serde_json::Map<String, serde_json::Value> = feed
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    let params = SetExtraHttpHeadersParams::new(Headers::new(serde_json::Value::Object(map)));
    if let Err(e) = page.execute(params).await {
        debug!(feed = %feed.name, error = %e, "failed to set extra headers");
    }
}
