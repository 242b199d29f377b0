//! Data types shared across the scraper.

pub mod config;
pub mod record;

pub use config::{ObjectStoreConfig, RetryPolicy, ScraperConfig, UploadConfig};
pub use record::{ImageRecord, PageError, ScrapeOutcome, ScrapeRequest, ScrapeStats, UploadOutcome};
