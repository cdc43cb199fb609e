//! Data model for the ingestion pipeline
//!
//! `Job` is the leaf type of the crate: everything else (matcher, dedup,
//! fetchers) depends on it, and it depends on nothing internal.

pub mod feed;
pub mod job;

pub use feed::{Feed, SiteProfile, Transport};
pub use job::Job;
