//! Core trait abstractions for the scraper.
//!
//! These traits define the collaborators the pipeline is built against:
//! page fetching, image download, object storage and record storage.

pub mod fetcher;
pub mod store;
