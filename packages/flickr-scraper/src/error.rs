//! Typed errors for the scraper.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure family and decide what to retry or report.

use thiserror::Error;

/// Errors raised while fetching one search-results page (or a photo detail page).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: timeout, refused connection, broken body.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The page lies beyond the last available result.
    #[error("page {page} is beyond the last result")]
    EmptyPage { page: u32 },

    /// The request could not be built (bad base URL, bad header value).
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl FetchError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Network failures and 5xx responses are transient; 4xx responses and
    /// empty pages are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::HttpStatus { status, .. } => (500..600).contains(status),
            FetchError::EmptyPage { .. } | FetchError::InvalidRequest { .. } => false,
        }
    }

    pub fn is_empty_page(&self) -> bool {
        matches!(self, FetchError::EmptyPage { .. })
    }

    /// Build a network error from any transport error.
    pub fn network(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FetchError::Network {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

/// Errors raised while moving one image into the object store.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Downloading the source bytes failed.
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Writing the bytes to the object store failed.
    #[error("store write failed for {key}: {reason}")]
    StoreWrite { key: String, reason: String },

    /// The object store client could not be set up; no write was attempted.
    #[error("object store configuration error: {reason}")]
    Configuration { reason: String },
}

/// Errors raised while writing records to the relational store.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store could not be reached; nothing was written.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A single record violated a store constraint.
    #[error("constraint violation for {identifier}: {message}")]
    Constraint { identifier: String, message: String },

    /// The store rejected the batch as a whole.
    #[error("batch write failed for {} records: {message}", .identifiers.len())]
    BatchAggregate {
        identifiers: Vec<String>,
        message: String,
    },
}

/// Errors that abort a scrape before any page is dispatched.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid scrape request: {reason}")]
    InvalidRequest { reason: String },
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Result type alias for persist operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;
