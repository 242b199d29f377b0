//! Flickr Search Scraper
//!
//! Fetches photo listings from Flickr search-result pages in parallel,
//! extracts per-photo metadata (id, owner, full-size image URL, location),
//! collapses duplicates across pages, and archives the results to an object
//! store (image bytes) and a relational store (one row per photo).
//!
//! # Usage
//!
//! ```rust,ignore
//! use flickr_scraper::{ArtifactManager, HttpPageFetcher, ScrapeCoordinator, ScraperConfig};
//! use flickr_scraper::stores::{MemoryObjectStore, MemoryRecordStore};
//! use flickr_scraper::testing::MockImageSource;
//!
//! let config = ScraperConfig::default();
//! let coordinator = ScrapeCoordinator::new(HttpPageFetcher::new(&config)?, config);
//!
//! let mut outcome = coordinator.scrape("paris", 2, 2).await?;
//! for failure in &outcome.page_errors {
//!     eprintln!("page {} failed: {}", failure.page, failure.error);
//! }
//!
//! let manager = ArtifactManager::new(Default::default())
//!     .with_uploads(MockImageSource::new(), MemoryObjectStore::new("https://bucket"))
//!     .with_record_store(MemoryRecordStore::new());
//! manager.upload_to_store(&mut outcome.records).await;
//! manager.persist(&outcome.records).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (PageFetcher, ImageSource, ObjectStore, RecordStore)
//! - [`types`] - Records, requests, outcomes and configuration
//! - [`extractor`] - Markup → records
//! - [`pipeline`] - Scrape coordinator and artifact manager
//! - [`fetchers`] - reqwest-backed page fetcher and image source
//! - [`stores`] - Object and record store implementations
//! - [`settings`] - Environment-driven store credentials
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod extractor;
pub mod fetchers;
pub mod pipeline;
pub mod security;
pub mod settings;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, PersistError, ScrapeError, UploadError};
pub use extractor::{parse_coordinates, PageExtraction, RecordExtractor};
pub use fetchers::{HttpImageSource, HttpPageFetcher};
pub use pipeline::{ArtifactManager, RecordMerger, ScrapeCoordinator};
pub use settings::Settings;
pub use traits::{
    fetcher::PageFetcher,
    store::{ImageBytes, ImageSource, ObjectStore, RecordStore},
};
pub use types::{
    config::{ObjectStoreConfig, RetryPolicy, ScraperConfig, UploadConfig},
    record::{ImageRecord, PageError, ScrapeOutcome, ScrapeRequest, ScrapeStats, UploadOutcome},
};
