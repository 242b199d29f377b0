//! Records, requests and per-unit outcomes.

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, ScrapeError};

/// Metadata for one photo found on a search-results page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Site-assigned photo id; unique within one scrape result.
    pub identifier: String,

    /// Owner account id (NSID or path alias).
    pub owner_id: String,

    /// Full-resolution image URL on the photo host.
    pub source_url: String,

    /// Public URL in the object store, set after a successful upload.
    pub store_url: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ImageRecord {
    /// Create a record without store URL or geolocation.
    pub fn new(
        identifier: impl Into<String>,
        owner_id: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            owner_id: owner_id.into(),
            source_url: source_url.into(),
            store_url: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Attach coordinates.
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Both coordinates are present.
    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Canonical photo page on the site.
    pub fn photo_page_url(&self, detail_base: &str) -> String {
        format!(
            "{}/{}/{}/",
            detail_base.trim_end_matches('/'),
            self.owner_id,
            self.identifier
        )
    }
}

/// Transient per-call scrape parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub query: String,
    pub num_pages: u32,
    pub num_workers: u32,
}

impl ScrapeRequest {
    pub fn new(query: impl Into<String>, num_pages: u32, num_workers: u32) -> Self {
        Self {
            query: query.into(),
            num_pages,
            num_workers,
        }
    }

    /// Validate the request and clamp workers to the number of pages.
    pub fn normalized(mut self) -> Result<Self, ScrapeError> {
        if self.query.trim().is_empty() {
            return Err(ScrapeError::InvalidRequest {
                reason: "query must not be empty".to_string(),
            });
        }
        if self.num_pages == 0 {
            return Err(ScrapeError::InvalidRequest {
                reason: "num_pages must be at least 1".to_string(),
            });
        }
        if self.num_workers == 0 {
            return Err(ScrapeError::InvalidRequest {
                reason: "num_workers must be at least 1".to_string(),
            });
        }
        self.num_workers = self.num_workers.min(self.num_pages);
        Ok(self)
    }
}

/// A page that could not be scraped after all retries.
#[derive(Debug)]
pub struct PageError {
    pub page: u32,
    pub attempts: u32,
    pub error: FetchError,
}

/// Counters gathered during one scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    /// Pages handed to a worker.
    pub pages_dispatched: u32,

    /// Pages that turned out to be beyond the last result.
    pub pages_empty: u32,

    /// Listing nodes dropped because identifier or source URL was missing.
    pub skipped_nodes: usize,

    /// Records discarded because an earlier page already had the identifier.
    pub duplicates_collapsed: usize,

    /// Records whose coordinates came from the photo detail page.
    pub geo_enriched: usize,

    /// The caller cancelled before every page was dispatched.
    pub cancelled: bool,
}

/// Everything a scrape produced: records, failures and counters.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// Deduplicated records ordered by (page, position on page).
    pub records: Vec<ImageRecord>,
    pub page_errors: Vec<PageError>,
    pub stats: ScrapeStats,
}

impl ScrapeOutcome {
    pub fn is_success(&self) -> bool {
        self.page_errors.is_empty()
    }

    /// Page numbers that failed permanently, ascending.
    pub fn failed_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.page_errors.iter().map(|e| e.page).collect();
        pages.sort_unstable();
        pages
    }
}

/// Per-record result of an upload or persist call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Succeeded {
        identifier: String,
        store_url: Option<String>,
    },
    Failed {
        identifier: String,
        reason: String,
    },
}

impl UploadOutcome {
    pub fn succeeded(identifier: impl Into<String>, store_url: Option<String>) -> Self {
        UploadOutcome::Succeeded {
            identifier: identifier.into(),
            store_url,
        }
    }

    pub fn failed(identifier: impl Into<String>, reason: impl ToString) -> Self {
        UploadOutcome::Failed {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            UploadOutcome::Succeeded { identifier, .. } | UploadOutcome::Failed { identifier, .. } => {
                identifier
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Succeeded { .. })
    }

    pub fn store_url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Succeeded { store_url, .. } => store_url.as_deref(),
            UploadOutcome::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            UploadOutcome::Failed { reason, .. } => Some(reason),
            UploadOutcome::Succeeded { .. } => None,
        }
    }
}
