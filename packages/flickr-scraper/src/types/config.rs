//! Configuration types for scraping and uploading.

use std::time::Duration;

use crate::security::StoreToken;

/// Search results page on the site.
pub const DEFAULT_SEARCH_URL: &str = "https://www.flickr.com/search/";

/// Base for photo detail pages: `{base}/{owner}/{id}/`.
pub const DEFAULT_DETAIL_URL: &str = "https://www.flickr.com/photos/";

/// Desktop browser user agent; the site blocks obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:52.0) Gecko/20100101 Firefox/52.0";

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after that.
    pub base_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Configuration for fetching and extracting search pages.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub search_url: String,
    pub detail_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,

    /// Idle connections kept per host in the shared pool.
    pub pool_max_idle_per_host: usize,

    pub retry: RetryPolicy,

    /// Fetch photo detail pages to fill in missing coordinates.
    pub enrich_geolocation: bool,

    /// Size suffix used when rewriting thumbnails to full resolution (`b` = 1024px).
    pub full_size_suffix: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            detail_url: DEFAULT_DETAIL_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            retry: RetryPolicy::default(),
            enrich_geolocation: false,
            full_size_suffix: "b".to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a different search endpoint (tests, mirrors).
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_detail_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_geolocation(mut self, enabled: bool) -> Self {
        self.enrich_geolocation = enabled;
        self
    }

    pub fn with_full_size_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.full_size_suffix = suffix.into();
        self
    }
}

/// Configuration for the artifact manager.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Concurrent uploads; separate from the scrape worker count.
    pub workers: usize,

    /// Prefix prepended to every object key (e.g. `photos/`).
    pub key_prefix: String,

    /// Extension used when the source URL has none.
    pub default_extension: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            key_prefix: String::new(),
            default_extension: "jpg".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// Where uploaded objects are written.
///
/// With a `token`, writes go to the `endpoint` gateway as bearer-authenticated
/// PUTs. Without one, writes are SigV4-signed S3 requests using the standard
/// AWS credential chain, against `endpoint` when set.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,

    /// Path-style endpoint, e.g. `http://localhost:9000`. `None` means AWS S3.
    pub endpoint: Option<String>,

    /// Region override; otherwise taken from the AWS environment.
    pub region: Option<String>,

    /// Base of the URLs handed back to callers.
    pub public_base_url: String,

    /// Canned ACL sent with each write.
    pub acl: Option<String>,

    /// Bearer token for a gateway endpoint.
    pub token: Option<StoreToken>,

    pub timeout: Duration,
}

impl ObjectStoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        Self {
            public_base_url: format!("https://{}.s3.amazonaws.com", bucket),
            bucket,
            endpoint: None,
            region: None,
            acl: Some("public-read".to_string()),
            token: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<StoreToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_acl(mut self, acl: Option<String>) -> Self {
        self.acl = acl;
        self
    }

    /// Writes go through a bearer-token gateway rather than signed S3 requests.
    pub fn uses_gateway(&self) -> bool {
        self.token.is_some()
    }

    /// `{public_base_url}/{key}`.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
        assert_eq!(policy.delay_before(5), Duration::from_millis(2000));
    }

    #[test]
    fn test_upload_workers_never_zero() {
        assert_eq!(UploadConfig::new().with_workers(0).workers, 1);
    }

    #[test]
    fn test_scraper_config_builder() {
        let config = ScraperConfig::new()
            .with_search_url("http://localhost:9000/search/")
            .with_geolocation(true)
            .with_retry(RetryPolicy::none());

        assert_eq!(config.search_url, "http://localhost:9000/search/");
        assert!(config.enrich_geolocation);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.full_size_suffix, "b");
    }

    #[test]
    fn test_object_store_defaults_to_public_s3_urls() {
        let config = ObjectStoreConfig::new("flickr-photos");
        assert_eq!(
            config.public_url("/42.jpg"),
            "https://flickr-photos.s3.amazonaws.com/42.jpg"
        );
        assert_eq!(config.acl.as_deref(), Some("public-read"));
        assert!(!config.uses_gateway());
        assert!(config.with_token("tok").uses_gateway());
    }

    #[test]
    fn test_object_store_token_is_redacted_in_debug() {
        let config = ObjectStoreConfig::new("photos").with_token("very-secret");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }
}
