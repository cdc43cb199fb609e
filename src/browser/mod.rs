//! Headless browser management
//!
//! A bounded pool of long-lived per-domain browser contexts with LRU
//! eviction, persisted cookie jars, stealth launch configuration and
//! optional proxy egress for anti-bot-sensitive domains.

pub mod cookies;
pub mod pool;
pub mod setup;
pub mod stealth;

pub use cookies::{CookieRecord, CookieStore};
pub use pool::{BrowserPool, BrowserPoolConfig, DomainContext};
pub use setup::{find_browser_executable, launch_browser, LaunchOptions};
