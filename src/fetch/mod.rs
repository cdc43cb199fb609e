//! Fetchers: static HTTP transports and the headless browser path
//!
//! The orchestrator dispatches each feed here by transport. Fetchers
//! return a typed `FetchError`; classification into retry behavior is the
//! orchestrator's job.

pub mod challenge;
pub mod headless;
pub mod static_http;

pub use headless::HeadlessFetcher;
pub use static_http::StaticFetcher;
