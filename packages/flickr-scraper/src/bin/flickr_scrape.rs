//! CLI for scraping Flickr search results
//!
//! Scrapes the requested pages, then optionally uploads the images and
//! persists the records. Prints a summary (or JSON with `--json`).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use flickr_scraper::stores::{connect_object_store, PostgresRecordStore};
use flickr_scraper::{
    ArtifactManager, HttpImageSource, HttpPageFetcher, ImageRecord, ImageSource, PageFetcher,
    RetryPolicy, ScrapeCoordinator, ScrapeRequest, ScraperConfig, Settings, UploadOutcome,
};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flickr-scrape")]
#[command(about = "Scrape Flickr search results and archive the photos")]
struct Cli {
    /// Search text
    query: String,

    /// Number of result pages to scrape
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Concurrent page workers (clamped to the number of pages)
    #[arg(long, default_value_t = 4)]
    workers: u32,

    /// Upload images to the object store
    #[arg(long)]
    upload: bool,

    /// Persist records to Postgres
    #[arg(long)]
    persist: bool,

    /// Look up coordinates on each photo's page when the listing has none
    #[arg(long)]
    geo: bool,

    /// Attempts per page, including the first
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    query: String,
    scraped_at: DateTime<Utc>,
    records: Vec<ImageRecord>,
    failed_pages: Vec<FailedPage>,
    empty_pages: u32,
    skipped_nodes: usize,
    duplicates_collapsed: usize,
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uploads: Option<Vec<UploadOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persisted: Option<Vec<UploadOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persist_error: Option<String>,
}

#[derive(Serialize)]
struct FailedPage {
    page: u32,
    attempts: u32,
    reason: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flickr_scraper=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("Failed to load settings")?;

    let config = ScraperConfig::default()
        .with_geolocation(cli.geo)
        .with_retry(RetryPolicy::new(cli.attempts, Duration::from_millis(500)));

    let fetcher = HttpPageFetcher::new(&config).context("Failed to create page fetcher")?;
    let images = HttpImageSource::from_client(fetcher.client().clone());

    // Stores are resolved before the first page is fetched.
    let manager = connect_stores(&cli, &settings, images).await?;
    let coordinator = ScrapeCoordinator::new(fetcher, config);

    // Ctrl+C stops dispatching new pages; finished pages are kept.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal, draining in-flight pages");
        on_signal.cancel();
    });

    let summary = run(&cli, &coordinator, &manager, cancel).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(reason) = &summary.persist_error {
        bail!("Failed to persist records: {}", reason);
    }
    Ok(())
}

/// Build the artifact manager for the requested steps, connecting each store.
async fn connect_stores(
    cli: &Cli,
    settings: &Settings,
    images: impl ImageSource + 'static,
) -> Result<ArtifactManager> {
    let mut manager = ArtifactManager::new(settings.upload_config());

    if cli.upload {
        let store_config = settings.require_object_store()?.clone();
        let objects = connect_object_store(store_config)
            .await
            .context("Failed to create object store")?;
        manager = manager.with_uploads(images, objects);
    }

    if cli.persist {
        let database_url = settings.require_database_url()?;
        let store = PostgresRecordStore::new(database_url.expose())
            .await
            .context("Failed to connect to Postgres")?;
        store
            .ensure_schema()
            .await
            .context("Failed to create photos table")?;
        manager = manager.with_record_store(store);
    }

    Ok(manager)
}

/// Scrape, upload and persist. A persist failure is reported in the summary
/// so the scraped records and upload results are still printed.
async fn run<F: PageFetcher + 'static>(
    cli: &Cli,
    coordinator: &ScrapeCoordinator<F>,
    manager: &ArtifactManager,
    cancel: CancellationToken,
) -> Result<Summary> {
    let scraped_at = Utc::now();
    let request = ScrapeRequest::new(&cli.query, cli.pages, cli.workers);
    let mut outcome = coordinator
        .scrape_with_cancel(request, cancel)
        .await
        .context("Invalid scrape request")?;

    let uploads = if cli.upload {
        Some(manager.upload_to_store(&mut outcome.records).await)
    } else {
        None
    };

    let (persisted, persist_error) = if cli.persist {
        match manager.persist(&outcome.records).await {
            Ok(outcomes) => (Some(outcomes), None),
            Err(e) => {
                error!(error = %e, "Persist failed, keeping scraped records in the summary");
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    Ok(Summary {
        query: cli.query.clone(),
        scraped_at,
        failed_pages: outcome
            .page_errors
            .iter()
            .map(|e| FailedPage {
                page: e.page,
                attempts: e.attempts,
                reason: e.error.to_string(),
            })
            .collect(),
        empty_pages: outcome.stats.pages_empty,
        skipped_nodes: outcome.stats.skipped_nodes,
        duplicates_collapsed: outcome.stats.duplicates_collapsed,
        cancelled: outcome.stats.cancelled,
        records: outcome.records,
        uploads,
        persisted,
        persist_error,
    })
}

fn print_summary(summary: &Summary) {
    println!("Query: {} ({})", summary.query, summary.scraped_at.to_rfc3339());
    println!("Records: {}", summary.records.len());
    println!(
        "Empty pages: {}  Skipped nodes: {}  Duplicates: {}",
        summary.empty_pages, summary.skipped_nodes, summary.duplicates_collapsed
    );
    if summary.cancelled {
        println!("Scrape was cancelled before every page was dispatched");
    }

    for failed in &summary.failed_pages {
        println!(
            "  page {} failed after {} attempt(s): {}",
            failed.page, failed.attempts, failed.reason
        );
    }

    for (label, outcomes) in [("Uploaded", &summary.uploads), ("Persisted", &summary.persisted)] {
        let Some(outcomes) = outcomes else { continue };
        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        println!("{}: {}/{}", label, ok, outcomes.len());
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            println!(
                "  {}: {}",
                outcome.identifier(),
                outcome.reason().unwrap_or("unknown")
            );
        }
    }

    if let Some(reason) = &summary.persist_error {
        println!("Persist failed: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flickr_scraper::stores::{MemoryObjectStore, MemoryRecordStore};
    use flickr_scraper::testing::{
        listing_page_html, numbered_listings, MockImageSource, MockPageFetcher,
    };
    use flickr_scraper::UploadConfig;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("flickr-scrape").chain(args.iter().copied()))
    }

    fn empty_settings() -> Settings {
        Settings::from_lookup(|_| None).unwrap()
    }

    #[tokio::test]
    async fn test_missing_database_url_fails_before_scraping() {
        let cli = cli(&["paris", "--pages", "50", "--persist"]);

        let err = connect_stores(&cli, &empty_settings(), MockImageSource::new())
            .await
            .err()
            .unwrap();

        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn test_missing_bucket_fails_before_scraping() {
        let cli = cli(&["paris", "--upload"]);

        let err = connect_stores(&cli, &empty_settings(), MockImageSource::new())
            .await
            .err()
            .unwrap();

        assert!(err.to_string().contains("OBJECT_STORE_BUCKET"));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_records_and_uploads() {
        let cli = cli(&["paris", "--pages", "2", "--workers", "2", "--upload", "--persist"]);
        let fetcher = MockPageFetcher::new()
            .with_page(1, listing_page_html(&numbered_listings(1, 3, "alice")))
            .with_page(2, listing_page_html(&numbered_listings(4, 2, "bob")));
        let coordinator = ScrapeCoordinator::new(fetcher, ScraperConfig::default());

        let records = MemoryRecordStore::new();
        records.set_unavailable(true);
        let manager = ArtifactManager::new(UploadConfig::default())
            .with_uploads(
                MockImageSource::new(),
                MemoryObjectStore::new("https://flickr-photos.s3.amazonaws.com"),
            )
            .with_record_store(records);

        let summary = run(&cli, &coordinator, &manager, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.records.len(), 5);
        assert!(summary.records.iter().all(|r| r.store_url.is_some()));
        let uploads = summary.uploads.as_ref().unwrap();
        assert!(uploads.iter().all(|o| o.is_success()));
        assert!(summary.persisted.is_none());
        assert!(summary.persist_error.unwrap().contains("connection error"));
    }
}
