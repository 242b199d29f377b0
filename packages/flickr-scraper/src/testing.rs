//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the coordinator and artifact manager
//! without touching the network.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, UploadError, UploadResult};
use crate::traits::fetcher::PageFetcher;
use crate::traits::store::{ImageBytes, ImageSource};

/// Canned response for one fetch.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with this markup.
    Page(String),
    /// Page beyond the last result.
    Empty,
    /// Non-success HTTP status.
    Status(u16),
    /// Transport failure.
    NetworkError,
}

impl MockResponse {
    fn into_result(self, query: &str, page: u32) -> FetchResult<String> {
        let url = format!("mock://search?text={}&page={}", query, page);
        match self {
            MockResponse::Page(markup) => Ok(markup),
            MockResponse::Empty => Err(FetchError::EmptyPage { page }),
            MockResponse::Status(status) => Err(FetchError::HttpStatus { url, status }),
            MockResponse::NetworkError => Err(FetchError::network(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}

/// Mock page fetcher for testing.
///
/// Pages not configured behave as beyond the last result. A page configured
/// with a sequence of responses plays them in order and repeats the last one.
#[derive(Default)]
pub struct MockPageFetcher {
    pages: Arc<RwLock<HashMap<u32, VecDeque<MockResponse>>>>,
    photo_pages: Arc<RwLock<HashMap<String, String>>>,
    latency: Duration,

    /// Track calls for verification
    calls: Arc<RwLock<Vec<u32>>>,
    photo_calls: Arc<RwLock<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `markup` for `page`.
    pub fn with_page(self, page: u32, markup: impl Into<String>) -> Self {
        self.with_responses(page, vec![MockResponse::Page(markup.into())])
    }

    /// Play `responses` for successive fetches of `page`.
    pub fn with_responses(self, page: u32, responses: Vec<MockResponse>) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(page, responses.into_iter().collect());
        self
    }

    /// Serve a photo detail page for `identifier`.
    pub fn with_photo_page(self, identifier: impl Into<String>, markup: impl Into<String>) -> Self {
        self.photo_pages
            .write()
            .unwrap()
            .insert(identifier.into(), markup.into());
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Search pages requested, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of fetches issued for one page.
    pub fn calls_for(&self, page: u32) -> usize {
        self.calls.read().unwrap().iter().filter(|p| **p == page).count()
    }

    /// Identifiers whose detail page was requested.
    pub fn photo_calls(&self) -> Vec<String> {
        self.photo_calls.read().unwrap().clone()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, page: u32) -> MockResponse {
        let mut pages = self.pages.write().unwrap();
        match pages.get_mut(&page) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockResponse::Empty),
            Some(queue) => queue.front().cloned().unwrap_or(MockResponse::Empty),
            None => MockResponse::Empty,
        }
    }
}

impl Clone for MockPageFetcher {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            photo_pages: Arc::clone(&self.photo_pages),
            latency: self.latency,
            calls: Arc::clone(&self.calls),
            photo_calls: Arc::clone(&self.photo_calls),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
        }
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, query: &str, page: u32) -> FetchResult<String> {
        self.calls.write().unwrap().push(page);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.next_response(page);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response.into_result(query, page)
    }

    async fn fetch_photo_page(&self, owner_id: &str, identifier: &str) -> FetchResult<String> {
        self.photo_calls.write().unwrap().push(identifier.to_string());

        self.photo_pages
            .read()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                url: format!("mock://photos/{}/{}/", owner_id, identifier),
                status: 404,
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock image source.
///
/// Every URL downloads successfully (with its own URL as the body) unless
/// marked unreachable.
#[derive(Default, Clone)]
pub struct MockImageSource {
    images: Arc<RwLock<HashMap<String, Bytes>>>,
    unreachable: Arc<RwLock<HashSet<String>>>,
    downloads: Arc<RwLock<Vec<String>>>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, url: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.images.write().unwrap().insert(url.into(), bytes.into());
        self
    }

    /// Fail every download of `url`.
    pub fn with_unreachable(self, url: impl Into<String>) -> Self {
        self.unreachable.write().unwrap().insert(url.into());
        self
    }

    /// Delay every download, so concurrent uploads overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.read().unwrap().clone()
    }

    /// Peak number of downloads running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn download(&self, url: &str) -> UploadResult<ImageBytes> {
        self.downloads.write().unwrap().push(url.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.read().unwrap().contains(url) {
            return Err(UploadError::Download {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let bytes = self
            .images
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Bytes::from(url.as_bytes().to_vec()));

        Ok(ImageBytes::new(bytes).with_content_type("image/jpeg"))
    }
}

/// One listing node in a generated search page.
#[derive(Debug, Clone)]
pub struct ListingFixture {
    pub identifier: String,
    pub owner_id: String,
    pub secret: String,
    pub location: Option<(f64, f64)>,
}

impl ListingFixture {
    pub fn new(identifier: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            owner_id: owner_id.into(),
            secret: "a1b2c3".to_string(),
            location: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some((latitude, longitude));
        self
    }

    /// Thumbnail as it appears in the listing's inline style.
    pub fn thumbnail(&self) -> String {
        format!(
            "//live.staticflickr.com/65535/{}_{}_n.jpg",
            self.identifier, self.secret
        )
    }

    /// Source URL the extractor derives with the default `b` suffix.
    pub fn source_url(&self) -> String {
        format!(
            "https://live.staticflickr.com/65535/{}_{}_b.jpg",
            self.identifier, self.secret
        )
    }
}

/// Render a search-results page with one listing node per fixture.
pub fn listing_page_html(listings: &[ListingFixture]) -> String {
    let nodes: String = listings
        .iter()
        .map(|listing| {
            let geo = listing
                .location
                .map(|(lat, lon)| format!(r#" data-latitude="{}" data-longitude="{}""#, lat, lon))
                .unwrap_or_default();
            format!(
                r#"<div class="view photo-list-photo-view awake"{geo} style="transform: translate(0px, 0px); background-image: url({thumb})">
  <div class="interaction-view"><div class="photo-list-photo-interaction">
    <a class="overlay" href="/photos/{owner}/{id}/" tabindex="0"></a>
  </div></div>
</div>
"#,
                geo = geo,
                thumb = listing.thumbnail(),
                owner = listing.owner_id,
                id = listing.identifier,
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>Search: Flickr</title></head>
<body><div class="search-photos-results"><div class="view photo-list-view">
{}</div></div></body></html>"#,
        nodes
    )
}

/// `count` fixtures with identifiers `start..start + count`.
pub fn numbered_listings(start: u64, count: u64, owner_id: &str) -> Vec<ListingFixture> {
    (start..start + count)
        .map(|id| ListingFixture::new(id.to_string(), owner_id))
        .collect()
}

/// Detail page carrying coordinates in its model-export script.
pub fn photo_page_html(latitude: f64, longitude: f64) -> String {
    format!(
        r#"<html><body><script class="modelExport">modelExport: {{"photo-models":[{{"location":{{"latitude":{},"longitude":{},"accuracy":16}}}}]}}</script></body></html>"#,
        latitude, longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_plays_sequence_then_repeats_last() {
        let fetcher = MockPageFetcher::new().with_responses(
            1,
            vec![MockResponse::Status(503), MockResponse::Page("ok".into())],
        );

        assert!(fetcher.fetch("q", 1).await.is_err());
        assert_eq!(fetcher.fetch("q", 1).await.unwrap(), "ok");
        assert_eq!(fetcher.fetch("q", 1).await.unwrap(), "ok");
        assert_eq!(fetcher.calls_for(1), 3);
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_page_is_empty() {
        let fetcher = MockPageFetcher::new();
        let err = fetcher.fetch("q", 9).await.unwrap_err();
        assert!(err.is_empty_page());
    }

    #[tokio::test]
    async fn test_mock_image_source_unreachable() {
        let source = MockImageSource::new().with_unreachable("https://img/bad.jpg");
        assert!(source.download("https://img/bad.jpg").await.is_err());
        assert!(source.download("https://img/good.jpg").await.is_ok());
        assert_eq!(source.downloads().len(), 2);
    }
}
