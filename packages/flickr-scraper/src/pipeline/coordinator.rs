//! Parallel scrape across search-result pages.
//!
//! A fixed pool of `min(workers, pages)` tasks claims page numbers from a
//! shared counter. Each task runs fetch → extract → (optional) geolocation
//! enrichment on its own, then takes the merge lock just long enough to fold
//! its batch in. The lock is never held across a network call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::merge::RecordMerger;
use super::retry::with_retry;
use crate::error::ScrapeError;
use crate::extractor::{parse_coordinates, RecordExtractor};
use crate::traits::fetcher::PageFetcher;
use crate::types::config::ScraperConfig;
use crate::types::record::{ImageRecord, PageError, ScrapeOutcome, ScrapeRequest, ScrapeStats};

/// Orchestrates fetch + extract over a bounded worker pool.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = HttpPageFetcher::new(&ScraperConfig::default())?;
/// let coordinator = ScrapeCoordinator::new(fetcher, ScraperConfig::default());
///
/// let outcome = coordinator.scrape("paris", 2, 2).await?;
/// println!("{} records, {} failed pages", outcome.records.len(), outcome.page_errors.len());
/// ```
pub struct ScrapeCoordinator<F: PageFetcher> {
    fetcher: Arc<F>,
    extractor: RecordExtractor,
    config: ScraperConfig,
}

impl<F: PageFetcher + 'static> ScrapeCoordinator<F> {
    pub fn new(fetcher: F, config: ScraperConfig) -> Self {
        Self::from_arc(Arc::new(fetcher), config)
    }

    /// Share a fetcher that is also used elsewhere.
    pub fn from_arc(fetcher: Arc<F>, config: ScraperConfig) -> Self {
        Self {
            extractor: RecordExtractor::from_config(&config),
            fetcher,
            config,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrape pages `1..=num_pages` of `query` with up to `num_workers` tasks.
    pub async fn scrape(
        &self,
        query: &str,
        num_pages: u32,
        num_workers: u32,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        self.scrape_request(ScrapeRequest::new(query, num_pages, num_workers))
            .await
    }

    pub async fn scrape_request(&self, request: ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError> {
        self.scrape_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Scrape until done or until `cancel` fires.
    ///
    /// After cancellation no new page is claimed; pages already in flight
    /// finish and their records are kept.
    pub async fn scrape_with_cancel(
        &self,
        request: ScrapeRequest,
        cancel: CancellationToken,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let request = request.normalized()?;

        info!(
            query = %request.query,
            pages = request.num_pages,
            workers = request.num_workers,
            fetcher = self.fetcher.name(),
            "Starting scrape"
        );

        let shared = Arc::new(Shared {
            fetcher: Arc::clone(&self.fetcher),
            extractor: self.extractor.clone(),
            config: self.config.clone(),
            query: request.query.clone(),
            num_pages: request.num_pages,
            next_page: AtomicU32::new(1),
            cancel: cancel.clone(),
            state: Mutex::new(ScrapeState::default()),
        });

        let mut workers = JoinSet::new();
        for worker in 0..request.num_workers {
            workers.spawn(Arc::clone(&shared).run_worker(worker));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Scrape worker ended abnormally");
            }
        }

        let state = std::mem::take(&mut *shared.lock_state());
        let mut outcome = state.into_outcome();
        outcome.stats.cancelled = cancel.is_cancelled();

        info!(
            records = outcome.records.len(),
            failed_pages = outcome.page_errors.len(),
            empty_pages = outcome.stats.pages_empty,
            skipped = outcome.stats.skipped_nodes,
            duplicates = outcome.stats.duplicates_collapsed,
            cancelled = outcome.stats.cancelled,
            "Scrape complete"
        );

        Ok(outcome)
    }
}

/// The only state workers share.
#[derive(Default)]
struct ScrapeState {
    merger: RecordMerger,
    page_errors: Vec<PageError>,
    stats: ScrapeStats,
}

impl ScrapeState {
    fn absorb(&mut self, report: PageReport) {
        self.stats.pages_dispatched += 1;
        match report {
            PageReport::Extracted {
                page,
                records,
                skipped,
                geo_enriched,
            } => {
                self.stats.skipped_nodes += skipped;
                self.stats.geo_enriched += geo_enriched;
                self.merger.merge_page(page, records);
            }
            PageReport::Empty => self.stats.pages_empty += 1,
            PageReport::Failed(error) => self.page_errors.push(error),
        }
    }

    fn into_outcome(self) -> ScrapeOutcome {
        let mut stats = self.stats;
        stats.duplicates_collapsed = self.merger.duplicates();

        let mut page_errors = self.page_errors;
        page_errors.sort_by_key(|e| e.page);

        ScrapeOutcome {
            records: self.merger.into_sorted(),
            page_errors,
            stats,
        }
    }
}

enum PageReport {
    Extracted {
        page: u32,
        records: Vec<ImageRecord>,
        skipped: usize,
        geo_enriched: usize,
    },
    Empty,
    Failed(PageError),
}

struct Shared<F: PageFetcher> {
    fetcher: Arc<F>,
    extractor: RecordExtractor,
    config: ScraperConfig,
    query: String,
    num_pages: u32,
    next_page: AtomicU32,
    cancel: CancellationToken,
    state: Mutex<ScrapeState>,
}

impl<F: PageFetcher + 'static> Shared<F> {
    fn lock_state(&self) -> MutexGuard<'_, ScrapeState> {
        // A worker that panicked mid-merge leaves counters it already bumped; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_worker(self: Arc<Self>, worker: u32) {
        loop {
            if self.cancel.is_cancelled() {
                debug!(worker, "Cancelled, not claiming more pages");
                break;
            }

            let page = self.next_page.fetch_add(1, Ordering::SeqCst);
            if page > self.num_pages {
                break;
            }

            let report = self.scrape_page(page).await;
            self.lock_state().absorb(report);
        }
    }

    #[instrument(skip(self), fields(query = %self.query))]
    async fn scrape_page(&self, page: u32) -> PageReport {
        let attempted = with_retry(&self.config.retry, &self.cancel, |attempt| {
            debug!(page, attempt, "Fetching page");
            self.fetcher.fetch(&self.query, page)
        })
        .await;

        let markup = match attempted.result {
            Ok(markup) => markup,
            Err(error) if error.is_empty_page() => {
                debug!(page, "Page is beyond the last result");
                return PageReport::Empty;
            }
            Err(error) => {
                warn!(page, attempts = attempted.attempts, error = %error, "Page failed");
                return PageReport::Failed(PageError {
                    page,
                    attempts: attempted.attempts,
                    error,
                });
            }
        };

        let extraction = self.extractor.extract(&markup);
        if extraction.skipped > 0 {
            debug!(page, skipped = extraction.skipped, "Dropped unusable listing nodes");
        }

        let mut records = extraction.records;
        let geo_enriched = if self.config.enrich_geolocation {
            self.enrich_locations(&mut records).await
        } else {
            0
        };

        debug!(page, records = records.len(), source = ?extraction.source, "Extracted page");

        PageReport::Extracted {
            page,
            records,
            skipped: extraction.skipped,
            geo_enriched,
        }
    }

    /// Fill in coordinates from each photo's detail page. Failures leave them unset.
    async fn enrich_locations(&self, records: &mut [ImageRecord]) -> usize {
        let mut enriched = 0;

        for record in records.iter_mut().filter(|r| !r.has_location()) {
            if self.cancel.is_cancelled() {
                break;
            }

            match self
                .fetcher
                .fetch_photo_page(&record.owner_id, &record.identifier)
                .await
            {
                Ok(markup) => {
                    if let Some((latitude, longitude)) = parse_coordinates(&markup) {
                        record.latitude = Some(latitude);
                        record.longitude = Some(longitude);
                        enriched += 1;
                    }
                }
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Geolocation lookup failed");
                }
            }
        }

        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing_page_html, numbered_listings, MockPageFetcher};

    #[tokio::test]
    async fn test_rejects_zero_pages() {
        let coordinator = ScrapeCoordinator::new(MockPageFetcher::new(), ScraperConfig::default());
        let err = coordinator.scrape("paris", 0, 1).await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_clamps_workers_to_pages() {
        let fetcher = MockPageFetcher::new()
            .with_page(1, listing_page_html(&numbered_listings(1, 3, "alice")));
        let coordinator = ScrapeCoordinator::new(fetcher.clone(), ScraperConfig::default());

        let outcome = coordinator.scrape("paris", 1, 8).await.unwrap();

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(outcome.stats.pages_dispatched, 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_dispatches_nothing() {
        let fetcher = MockPageFetcher::new()
            .with_page(1, listing_page_html(&numbered_listings(1, 3, "alice")));
        let coordinator = ScrapeCoordinator::new(fetcher.clone(), ScraperConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = coordinator
            .scrape_with_cancel(ScrapeRequest::new("paris", 5, 2), cancel)
            .await
            .unwrap();

        assert!(outcome.records.is_empty());
        assert!(outcome.stats.cancelled);
        assert_eq!(fetcher.call_count(), 0);
    }
}
