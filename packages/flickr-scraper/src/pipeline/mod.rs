//! Scrape pipeline.
//!
//! - [`coordinator`] - parallel fetch + extract over search pages
//! - [`merge`] - first-seen-wins deduplication by page provenance
//! - [`retry`] - bounded exponential backoff for transient fetch errors
//! - [`artifacts`] - upload to the object store and persist to the record store

pub mod artifacts;
pub mod coordinator;
pub mod merge;
pub mod retry;

pub use artifacts::ArtifactManager;
pub use coordinator::ScrapeCoordinator;
pub use merge::{Provenance, RecordMerger};
pub use retry::{retry_fetch, with_retry, Attempted};
