//! Per-domain cookie persistence
//!
//! Cookies survive process restarts as `cookies/<domain>.json`, one JSON
//! array of records per domain. Writes go through a single serializing
//! worker task that never touches the pool mutex, so a save can never
//! deadlock shutdown; the per-save timeout is a safety cap, not a
//! correctness requirement.

use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One persisted cookie. A stable subset of the CDP cookie shape: enough
/// to restore a session, nothing browser-version-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

impl CookieRecord {
    /// Build a record from a live CDP cookie.
    #[must_use]
    pub fn from_cdp(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            expires: Some(cookie.expires),
            http_only: cookie.http_only,
            secure: cookie.secure,
        }
    }

    /// Convert back into the parameter shape Chrome accepts on restore.
    pub fn to_param(&self) -> Result<CookieParam, String> {
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .domain(self.domain.clone())
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(expires) = self.expires {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        builder.build()
    }

    /// A simple name/value pair scoped to a domain, as supplied in feed
    /// configuration.
    #[must_use]
    pub fn from_pair(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: false,
        }
    }
}

enum StoreOp {
    Save {
        domain: String,
        cookies: Vec<CookieRecord>,
    },
    Flush(tokio::sync::oneshot::Sender<()>),
}

/// Disk-backed cookie store with an owned writer task.
pub struct CookieStore {
    dir: PathBuf,
    tx: mpsc::UnboundedSender<StoreOp>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl CookieStore {
    /// Open a store rooted at `dir` and spawn its writer task.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoreOp>();
        let worker_dir = dir.clone();
        let worker = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    StoreOp::Save { domain, cookies } => {
                        if let Err(e) = write_cookie_file(&worker_dir, &domain, &cookies) {
                            warn!(domain, error = %e, "failed to persist cookies");
                        } else {
                            info!(domain, count = cookies.len(), "persisted cookies");
                        }
                    }
                    StoreOp::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("cookie writer task exiting");
        });

        Self {
            dir,
            tx,
            worker: parking_lot::Mutex::new(Some(worker)),
        }
    }

    /// Load persisted cookies for a domain. A missing file is not an
    /// error; it just means no session yet.
    #[must_use]
    pub fn load(&self, domain: &str) -> Vec<CookieRecord> {
        match read_cookie_file(&self.dir, domain) {
            Ok(Some(cookies)) => {
                info!(domain, count = cookies.len(), "loaded persisted cookies");
                cookies
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(domain, error = %e, "failed to read cookie file");
                Vec::new()
            }
        }
    }

    /// Queue a save. Never blocks the caller; the writer task serializes
    /// actual disk writes.
    pub fn save(&self, domain: &str, cookies: Vec<CookieRecord>) {
        let _ = self.tx.send(StoreOp::Save {
            domain: domain.to_string(),
            cookies,
        });
    }

    /// Wait until every save queued so far has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
        if self.tx.send(StoreOp::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Stop the writer task after draining pending saves.
    pub async fn shutdown(&self) {
        self.flush().await;
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
    }
}

/// Write a domain's cookie file. Creates the store directory on demand.
pub fn write_cookie_file(
    dir: &Path,
    domain: &str,
    cookies: &[CookieRecord],
) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{domain}.json"));
    let json = serde_json::to_string_pretty(cookies)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

/// Read a domain's cookie file, `Ok(None)` when it does not exist.
pub fn read_cookie_file(dir: &Path, domain: &str) -> std::io::Result<Option<Vec<CookieRecord>>> {
    let path = dir.join(format!("{domain}.json"));
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let cookies = serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(cookies))
}
