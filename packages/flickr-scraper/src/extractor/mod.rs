//! Record extraction from search-result markup.
//!
//! Two layouts are understood:
//! - DOM listing nodes (`div.photo-list-photo-view`), read first
//! - the embedded model-export script, used when the DOM has no listings
//!
//! Extraction never fails. Nodes missing an identifier or a source URL are
//! dropped and counted in [`PageExtraction::skipped`].

pub mod geo;
pub mod listing;
pub mod model_export;
pub mod urls;

use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::types::config::{ScraperConfig, DEFAULT_SEARCH_URL};
use crate::types::record::ImageRecord;

pub use geo::parse_coordinates;

static DEFAULT_SITE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_SEARCH_URL).expect("default search url"));

static NO_RESULTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".no-results, .no-results-message, .search-empty-state")
        .expect("no results selector")
});

/// Result of turning one node (or photo object) into a record.
#[derive(Debug)]
pub(crate) enum NodeOutcome {
    Extracted(ImageRecord),
    Skipped(&'static str),
}

/// Which layout the records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Listing,
    ModelExport,
    Nothing,
}

/// Records extracted from one page, in page order.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub records: Vec<ImageRecord>,

    /// Nodes dropped because identifier or source URL was missing.
    pub skipped: usize,

    pub source: ExtractionSource,
}

impl PageExtraction {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            source: ExtractionSource::Nothing,
        }
    }
}

/// Parses search-result markup into image records.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    site_base: Url,
    size_suffix: String,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an extractor that resolves relative links against the configured search URL.
    pub fn from_config(config: &ScraperConfig) -> Self {
        let site_base =
            Url::parse(&config.search_url).unwrap_or_else(|_| DEFAULT_SITE.clone());

        Self {
            site_base,
            size_suffix: config.full_size_suffix.clone(),
        }
    }

    /// Extract every record on the page.
    pub fn extract(&self, markup: &str) -> PageExtraction {
        if markup.trim().is_empty() {
            return PageExtraction::empty();
        }

        let document = Html::parse_document(markup);
        let nodes = listing::listing_nodes(&document);

        let (outcomes, source): (Vec<NodeOutcome>, _) = if !nodes.is_empty() {
            let outcomes = nodes
                .into_iter()
                .map(|node| listing::record_from_node(node, &self.site_base, &self.size_suffix))
                .collect();
            (outcomes, ExtractionSource::Listing)
        } else {
            match self.model_export_outcomes(markup) {
                Some(outcomes) => (outcomes, ExtractionSource::ModelExport),
                None => return PageExtraction::empty(),
            }
        };

        let mut extraction = PageExtraction {
            records: Vec::with_capacity(outcomes.len()),
            skipped: 0,
            source,
        };

        for outcome in outcomes {
            match outcome {
                NodeOutcome::Extracted(record) => extraction.records.push(record),
                NodeOutcome::Skipped(reason) => {
                    debug!(reason, "Skipping listing node");
                    extraction.skipped += 1;
                }
            }
        }

        extraction
    }

    fn model_export_outcomes(&self, markup: &str) -> Option<Vec<NodeOutcome>> {
        let script = model_export::script_text(markup)?;
        let objects = model_export::photo_objects(&script)?;
        Some(
            objects
                .iter()
                .map(|object| {
                    model_export::record_from_object(object, &self.site_base, &self.size_suffix)
                })
                .collect(),
        )
    }
}

/// The page renders the site's "no results" state.
pub fn is_no_results_page(markup: &str) -> bool {
    if markup.trim().is_empty() {
        return true;
    }
    let document = Html::parse_document(markup);
    let has_marker = document.select(&NO_RESULTS).next().is_some();
    has_marker && listing::listing_nodes(&document).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing_page_html, ListingFixture};

    #[test]
    fn test_extract_listing_page() {
        let html = listing_page_html(&[
            ListingFixture::new("1", "alice"),
            ListingFixture::new("2", "bob").with_location(40.7, -74.0),
        ]);

        let extraction = RecordExtractor::new().extract(&html);

        assert_eq!(extraction.source, ExtractionSource::Listing);
        assert_eq!(extraction.skipped, 0);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].identifier, "1");
        assert_eq!(extraction.records[1].latitude, Some(40.7));
    }

    #[test]
    fn test_extract_counts_skips() {
        let html = r#"
            <html><body>
              <div class="photo-list-photo-view" style="background-image: url(//live.staticflickr.com/1/5_a_n.jpg)">
                <a class="overlay" href="/photos/alice/5/"></a>
              </div>
              <div class="photo-list-photo-view" style="background-image: url(//live.staticflickr.com/1/6_a_n.jpg)"></div>
              <div class="photo-list-photo-view"><a class="overlay" href="/photos/alice/7/"></a></div>
            </body></html>
        "#;

        let extraction = RecordExtractor::new().extract(html);

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.skipped, 2);
    }

    #[test]
    fn test_extract_falls_back_to_model_export() {
        let html = r#"
            <html><body>
            <script class="modelExport">
              modelExport: {"search-photos-lite-models":[{"photos":{"_data":[
                {"id":"11","ownerNsid":"1@N00","sizes":{"w":{"url":"//live.staticflickr.com/65535/11_aa_w.jpg"}}},
                null,
                {"id":"12","ownerNsid":"2@N00","sizes":{"n":{"url":"//live.staticflickr.com/65535/12_bb_n.jpg"}}}
              ]}}]}
            </script>
            </body></html>
        "#;

        let extraction = RecordExtractor::new().extract(html);

        assert_eq!(extraction.source, ExtractionSource::ModelExport);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(
            extraction.records[1].source_url,
            "https://live.staticflickr.com/65535/12_bb_b.jpg"
        );
    }

    #[test]
    fn test_model_export_path_ids_are_skipped() {
        let html = r#"
            <html><body>
            <script class="modelExport">
              modelExport: {"photos":{"_data":[
                {"id":"../../other-bucket/owned","ownerNsid":"1@N00","sizes":{"w":{"url":"//live.staticflickr.com/65535/1_aa_w.jpg"}}},
                {"id":"12","ownerNsid":"2@N00","sizes":{"w":{"url":"//live.staticflickr.com/65535/12_bb_w.jpg"}}}
              ]}}
            </script>
            </body></html>
        "#;

        let extraction = RecordExtractor::new().extract(html);

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].identifier, "12");
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn test_extract_unparseable_markup_is_empty() {
        let extraction = RecordExtractor::new().extract("<<<not html at all");
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.source, ExtractionSource::Nothing);

        let extraction = RecordExtractor::new().extract("");
        assert!(extraction.records.is_empty());
    }

    #[test]
    fn test_is_no_results_page() {
        assert!(is_no_results_page(""));
        assert!(is_no_results_page(
            r#"<div class="no-results">We couldn't find anything matching your search.</div>"#
        ));
        assert!(!is_no_results_page(&listing_page_html(&[ListingFixture::new("1", "a")])));
    }
}
