//! Page fetching capability.
//!
//! The coordinator only needs "give me the markup of search page N" and
//! "give me the markup of this photo's page". Everything about URLs,
//! headers and connection reuse lives behind this trait.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Fetches raw markup from the photo site.
///
/// Implementations:
/// - `HttpPageFetcher` - reqwest with a shared connection pool
/// - `MockPageFetcher` - canned pages for tests
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one search-results page. `page` is 1-based.
    ///
    /// Returns `FetchError::EmptyPage` when the page lies beyond the last
    /// result; that is a stop signal, not a failure.
    async fn fetch(&self, query: &str, page: u32) -> FetchResult<String>;

    /// Fetch a photo's detail page (used for geolocation enrichment).
    async fn fetch_photo_page(&self, owner_id: &str, identifier: &str) -> FetchResult<String>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
