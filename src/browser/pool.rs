//! Per-domain browser context pool with LRU eviction
//!
//! One long-lived browser per domain keeps that domain's cookies, cache
//! and TLS session warm between runs. The pool is bounded: when a new
//! domain would exceed `max_contexts`, the least-recently-used entry is
//! evicted, its cookies saved and its browser closed.
//!
//! Concurrency contract: a single mutex guards the domain map, taken with
//! a short timeout and never held across browser launch, navigation or
//! cookie I/O. Callers copy what they need out of the entry, release, then
//! do I/O.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{GetCookiesParams, SetCookiesParams};
use chromiumoxide::Page;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::SiteProfile;
use crate::proxy::ProxyPool;
use crate::utils::constants::{
    COOKIES_DIR, COOKIE_SAVE_TIMEOUT, DEFAULT_MAX_CONTEXTS, POOL_LOCK_TIMEOUT,
    POOL_LOCK_TIMEOUT_SHUTDOWN,
};

use super::cookies::{CookieRecord, CookieStore};
use super::setup::{launch_browser, LaunchOptions};

/// Configuration for the browser pool.
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Maximum simultaneously-open per-domain contexts (default: 3).
    pub max_contexts: usize,
    pub headless: bool,
    /// Directory for persisted per-domain cookie files.
    pub cookies_dir: PathBuf,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_contexts: DEFAULT_MAX_CONTEXTS,
            headless: true,
            cookies_dir: PathBuf::from(COOKIES_DIR),
        }
    }
}

struct ContextEntry {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    last_used: Instant,
    proxy: Option<String>,
    user_data_dir: PathBuf,
}

/// Cheap handle to a pooled per-domain browser.
#[derive(Clone)]
pub struct DomainContext {
    pub domain: String,
    browser: Arc<Browser>,
}

impl DomainContext {
    /// Open a fresh blank page in this context. The page belongs to the
    /// caller; the underlying browser stays pooled.
    ///
    /// A failure here is transient: the pooled browser may have died and
    /// will be relaunched on a later run.
    pub async fn new_page(&self) -> Result<Page, FetchError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Connection(format!("failed to open page: {e}")))
    }
}

/// Bounded pool of per-domain browser contexts.
pub struct BrowserPool {
    config: BrowserPoolConfig,
    entries: Mutex<HashMap<String, ContextEntry>>,
    cookie_store: CookieStore,
    proxies: Arc<ProxyPool>,
    shutdown: AtomicBool,
}

impl BrowserPool {
    #[must_use]
    pub fn new(config: BrowserPoolConfig, proxies: Arc<ProxyPool>) -> Arc<Self> {
        let cookie_store = CookieStore::new(config.cookies_dir.clone());
        Arc::new(Self {
            config,
            entries: Mutex::new(HashMap::new()),
            cookie_store,
            proxies,
            shutdown: AtomicBool::new(false),
        })
    }

    async fn lock_entries(
        &self,
        timeout: Duration,
    ) -> Option<MutexGuard<'_, HashMap<String, ContextEntry>>> {
        tokio::time::timeout(timeout, self.entries.lock()).await.ok()
    }

    /// Get (or create) the context for a domain.
    ///
    /// Caller-supplied cookies are installed into the browser; persisted
    /// cookies from a previous run are restored on creation. Headers are
    /// per-page concerns and applied by the headless fetcher.
    pub async fn get_context(
        &self,
        domain: &str,
        cookies: &HashMap<String, String>,
    ) -> Result<DomainContext, FetchError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(FetchError::Browser("browser pool is shut down".into()));
        }

        // Fast path: existing entry.
        {
            let mut entries = self
                .lock_entries(POOL_LOCK_TIMEOUT)
                .await
                .ok_or_else(|| FetchError::Connection("browser pool busy".into()))?;
            if let Some(entry) = entries.get_mut(domain) {
                entry.last_used = Instant::now();
                debug!(domain, "reusing pooled browser context");
                return Ok(DomainContext {
                    domain: domain.to_string(),
                    browser: Arc::clone(&entry.browser),
                });
            }
        }

        // Evict the LRU entry if at capacity. The entry is removed under
        // the lock; its cookie save and close happen after release.
        let evicted = {
            let mut entries = self
                .lock_entries(POOL_LOCK_TIMEOUT)
                .await
                .ok_or_else(|| FetchError::Connection("browser pool busy".into()))?;
            if entries.len() >= self.config.max_contexts {
                let lru = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(d, _)| d.clone());
                lru.and_then(|d| entries.remove(&d).map(|e| (d, e)))
            } else {
                None
            }
        };
        if let Some((evicted_domain, entry)) = evicted {
            info!(domain = %evicted_domain, "evicting least-recently-used browser context");
            self.retire_entry(&evicted_domain, entry).await;
        }

        // Launch outside the lock.
        let proxy = self.select_proxy(domain);
        let opts = LaunchOptions {
            headless: self.config.headless,
            user_data_dir: Some(std::env::temp_dir().join(format!(
                "jobscout_ctx_{}_{}",
                sanitize(domain),
                std::process::id()
            ))),
            proxy: proxy.clone(),
            ..LaunchOptions::default()
        };
        let (browser, handler, user_data_dir) = launch_browser(&opts)
            .await
            .map_err(|e| FetchError::Browser(format!("browser launch failed: {e:#}")))?;
        let browser = Arc::new(browser);

        // Restore persisted cookies plus any caller-supplied ones.
        let mut restore = self.cookie_store.load(domain);
        for (name, value) in cookies {
            restore.push(CookieRecord::from_pair(name, value, domain));
        }
        if !restore.is_empty() {
            if let Err(e) = apply_cookies(&browser, &restore).await {
                warn!(domain, error = %e, "failed to restore cookies");
            }
        }

        // Insert, unless a concurrent caller created the same domain's
        // entry while we were launching; then keep theirs and retire ours.
        let mut entries = match self.lock_entries(POOL_LOCK_TIMEOUT).await {
            Some(guard) => guard,
            None => {
                handler.abort();
                cleanup_profile_dir(&user_data_dir);
                return Err(FetchError::Connection("browser pool busy".into()));
            }
        };
        if let Some(existing) = entries.get_mut(domain) {
            existing.last_used = Instant::now();
            let context = DomainContext {
                domain: domain.to_string(),
                browser: Arc::clone(&existing.browser),
            };
            drop(entries);
            debug!(domain, "lost creation race, closing duplicate browser");
            handler.abort();
            cleanup_profile_dir(&user_data_dir);
            return Ok(context);
        }

        entries.insert(
            domain.to_string(),
            ContextEntry {
                browser: Arc::clone(&browser),
                handler,
                last_used: Instant::now(),
                proxy,
                user_data_dir,
            },
        );
        info!(domain, contexts = entries.len(), "created browser context");

        Ok(DomainContext {
            domain: domain.to_string(),
            browser,
        })
    }

    /// Persist cookies the fetcher read off a live page. Queues onto the
    /// store's writer task; never touches the pool mutex.
    pub fn persist_cookies(&self, domain: &str, cookies: Vec<CookieRecord>) {
        if cookies.is_empty() {
            return;
        }
        self.cookie_store.save(domain, cookies);
    }

    /// Best-effort cookie snapshot of a pooled context.
    ///
    /// Skips silently when the pool mutex is contended; shutdown must
    /// never wait on this.
    pub async fn save_cookies(&self, domain: &str) {
        let browser = {
            let Some(entries) = self.lock_entries(POOL_LOCK_TIMEOUT).await else {
                debug!(domain, "skipping cookie save, pool busy");
                return;
            };
            match entries.get(domain) {
                Some(entry) => Arc::clone(&entry.browser),
                None => return,
            }
        };

        match tokio::time::timeout(COOKIE_SAVE_TIMEOUT, snapshot_cookies(&browser)).await {
            Ok(Ok(cookies)) => self.persist_cookies(domain, cookies),
            Ok(Err(e)) => warn!(domain, error = %e, "cookie snapshot failed"),
            Err(_) => warn!(domain, "cookie snapshot timed out"),
        }
    }

    /// Shut the pool down: save cookies, close every browser, stop the
    /// cookie writer. Bounded; safe to call from a process-exit handler.
    pub async fn shutdown(&self) {
        info!("shutting down browser pool");
        self.shutdown.store(true, Ordering::Relaxed);

        let drained: Vec<(String, ContextEntry)> = match self
            .lock_entries(POOL_LOCK_TIMEOUT_SHUTDOWN)
            .await
        {
            Some(mut entries) => entries.drain().collect(),
            None => {
                warn!("pool mutex contended at shutdown, abandoning open contexts");
                Vec::new()
            }
        };

        for (domain, entry) in drained {
            self.retire_entry(&domain, entry).await;
        }

        self.cookie_store.shutdown().await;
        info!("browser pool shutdown complete");
    }

    /// Save an entry's cookies (bounded), close its browser and clean up
    /// its profile directory.
    async fn retire_entry(&self, domain: &str, mut entry: ContextEntry) {
        match tokio::time::timeout(COOKIE_SAVE_TIMEOUT, snapshot_cookies(&entry.browser)).await {
            Ok(Ok(cookies)) => self.persist_cookies(domain, cookies),
            Ok(Err(e)) => warn!(domain, error = %e, "cookie save on retire failed"),
            Err(_) => warn!(domain, "cookie save on retire timed out, abandoning"),
        }

        if let Some(browser) = Arc::get_mut(&mut entry.browser) {
            if let Err(e) = browser.close().await {
                warn!(domain, error = %e, "failed to close browser");
            }
            let _ = browser.wait().await;
        } else {
            // Outstanding page handles keep the browser alive; dropping
            // the entry lets the last holder tear it down.
            warn!(domain, "browser has outstanding references, skipping graceful close");
        }
        entry.handler.abort();
        cleanup_profile_dir(&entry.user_data_dir);
    }

    fn select_proxy(&self, domain: &str) -> Option<String> {
        if !self.proxies.enabled() {
            return None;
        }
        match SiteProfile::for_domain(domain) {
            SiteProfile::AntiBot => self.proxies.next().map(|p| p.server()),
            _ => None,
        }
    }

    /// Proxy currently bound to a domain's context, for diagnostics.
    pub async fn proxy_for(&self, domain: &str) -> Option<String> {
        let entries = self.lock_entries(POOL_LOCK_TIMEOUT).await?;
        entries.get(domain).and_then(|e| e.proxy.clone())
    }

    /// Number of live contexts.
    pub async fn context_count(&self) -> usize {
        match self.lock_entries(POOL_LOCK_TIMEOUT).await {
            Some(entries) => entries.len(),
            None => 0,
        }
    }
}

/// Read all cookies from a context through a short-lived blank page.
async fn snapshot_cookies(browser: &Browser) -> anyhow::Result<Vec<CookieRecord>> {
    let page = browser.new_page("about:blank").await?;
    let result = page.execute(GetCookiesParams::default()).await?;
    let cookies = result
        .cookies
        .iter()
        .map(CookieRecord::from_cdp)
        .collect();
    let _ = page.close().await;
    Ok(cookies)
}

/// Install cookie records into a freshly-launched context.
async fn apply_cookies(browser: &Browser, records: &[CookieRecord]) -> anyhow::Result<()> {
    let params: Vec<_> = records
        .iter()
        .filter_map(|r| r.to_param().ok())
        .collect();
    if params.is_empty() {
        return Ok(());
    }
    let page = browser.new_page("about:blank").await?;
    page.execute(SetCookiesParams::new(params)).await?;
    let _ = page.close().await;
    Ok(())
}

fn cleanup_profile_dir(dir: &PathBuf) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        debug!(dir = %dir.display(), error = %e, "profile dir cleanup failed");
    }
}

fn sanitize(domain: &str) -> String {
    domain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
