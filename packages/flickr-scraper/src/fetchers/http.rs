//! reqwest-backed fetchers.
//!
//! One `reqwest::Client` is shared by every worker so connections to the
//! site are pooled and reused across pages.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult, UploadError, UploadResult};
use crate::extractor::is_no_results_page;
use crate::traits::fetcher::PageFetcher;
use crate::traits::store::{ImageBytes, ImageSource};
use crate::types::config::ScraperConfig;

/// Build the shared client with browser-like default headers.
pub fn build_client(config: &ScraperConfig) -> FetchResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let user_agent =
        HeaderValue::from_str(&config.user_agent).map_err(|e| FetchError::InvalidRequest {
            reason: format!("bad user agent: {}", e),
        })?;
    headers.insert(header::USER_AGENT, user_agent);

    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| FetchError::InvalidRequest {
            reason: format!("failed to create HTTP client: {}", e),
        })
}

fn parse_base(raw: &str) -> FetchResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| FetchError::InvalidRequest {
        reason: format!("bad base url {}: {}", raw, e),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Fetches search-results and photo pages over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = HttpPageFetcher::new(&ScraperConfig::default())?;
/// let markup = fetcher.fetch("paris", 1).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    search_url: Url,
    detail_url: Url,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> FetchResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            search_url: parse_base(&config.search_url)?,
            detail_url: parse_base(&config.detail_url)?,
        })
    }

    /// Use a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The shared client, for reuse by [`HttpImageSource`].
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `{search_url}?text={query}&page={page}`
    pub fn search_page_url(&self, query: &str, page: u32) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("text", query)
            .append_pair("page", &page.to_string());
        url
    }

    /// `{detail_url}{owner}/{id}/`
    pub fn photo_page_url(&self, owner_id: &str, identifier: &str) -> FetchResult<Url> {
        self.detail_url
            .join(&format!("{}/{}/", owner_id, identifier))
            .map_err(|e| FetchError::InvalidRequest {
                reason: format!("bad photo path {}/{}: {}", owner_id, identifier, e),
            })
    }

    async fn get(&self, url: &Url) -> FetchResult<(StatusCode, String)> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            FetchError::network(url.as_str(), e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        Ok((status, body))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, query: &str, page: u32) -> FetchResult<String> {
        let url = self.search_page_url(query, page);
        let (status, body) = self.get(&url).await?;

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::EmptyPage { page });
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if is_no_results_page(&body) {
            return Err(FetchError::EmptyPage { page });
        }

        debug!(page, bytes = body.len(), "Fetched search page");
        Ok(body)
    }

    async fn fetch_photo_page(&self, owner_id: &str, identifier: &str) -> FetchResult<String> {
        let url = self.photo_page_url(owner_id, identifier)?;
        let (status, body) = self.get(&url).await?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Downloads image bytes from the photo host.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(config: &ScraperConfig) -> FetchResult<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// Share an existing client (typically the page fetcher's).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn download(&self, url: &str) -> UploadResult<ImageBytes> {
        let download_error = |reason: String| UploadError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let mut image = ImageBytes::new(bytes);
        if let Some(content_type) = content_type {
            image = image.with_content_type(content_type);
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpPageFetcher {
        HttpPageFetcher::new(&ScraperConfig::default()).unwrap()
    }

    #[test]
    fn test_search_page_url_encodes_query() {
        let url = fetcher().search_page_url("eiffel tower", 3);
        assert_eq!(
            url.as_str(),
            "https://www.flickr.com/search/?text=eiffel+tower&page=3"
        );
    }

    #[test]
    fn test_photo_page_url() {
        let url = fetcher().photo_page_url("12345@N00", "42").unwrap();
        assert_eq!(url.as_str(), "https://www.flickr.com/photos/12345@N00/42/");
    }

    #[test]
    fn test_base_without_trailing_slash() {
        let config = ScraperConfig::default().with_detail_url("http://localhost:9000/photos");
        let fetcher = HttpPageFetcher::new(&config).unwrap();
        let url = fetcher.photo_page_url("bob", "7").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/photos/bob/7/");
    }

    #[test]
    fn test_bad_base_url_is_invalid_request() {
        let config = ScraperConfig::default().with_search_url("not a url");
        let err = HttpPageFetcher::new(&config).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest { .. }));
    }
}
