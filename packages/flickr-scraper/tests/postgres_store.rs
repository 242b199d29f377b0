//! PostgresRecordStore against a throwaway Postgres container.
//!
//! Needs a Docker daemon, so these are ignored by default:
//! `cargo test -p flickr-scraper --test postgres_store -- --ignored`

#![cfg(feature = "postgres")]

use anyhow::{Context, Result};
use flickr_scraper::stores::PostgresRecordStore;
use flickr_scraper::{ImageRecord, RecordStore};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

async fn start_store() -> Result<(ContainerAsync<Postgres>, PostgresRecordStore)> {
    let postgres = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .context("Failed to start Postgres container")?;

    let host = postgres.get_host().await?;
    let port = postgres.get_host_port_ipv4(5432).await?;
    let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    let store = PostgresRecordStore::new(&url).await?;
    store.ensure_schema().await?;
    Ok((postgres, store))
}

fn record(id: &str) -> ImageRecord {
    ImageRecord::new(id, "12345@N00", format!("https://live.staticflickr.com/65535/{}_abc_b.jpg", id))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_twice_leaves_one_row_per_photo() -> Result<()> {
    let (_container, store) = start_store().await?;
    let records = vec![
        record("1").with_location(48.8584, 2.2945),
        record("2"),
        record("3"),
    ];

    let first = store.upsert(&records).await?;
    let second = store.upsert(&records).await?;

    assert_eq!(first, second);
    assert!(first.iter().all(|o| o.is_success()));
    assert_eq!(store.count().await?, 3);
    assert_eq!(store.get("1").await?.unwrap().latitude, Some(48.8584));
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_keeps_known_store_url() -> Result<()> {
    let (_container, store) = start_store().await?;

    let mut uploaded = record("9");
    uploaded.store_url = Some("https://bucket.s3.amazonaws.com/9.jpg".to_string());
    store.upsert(&[uploaded]).await?;

    // A later scrape without upload must not erase the URL.
    store.upsert(&[record("9")]).await?;

    let stored = store.get("9").await?.unwrap();
    assert_eq!(
        stored.store_url.as_deref(),
        Some("https://bucket.s3.amazonaws.com/9.jpg")
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_bad_row_fails_alone() -> Result<()> {
    let (_container, store) = start_store().await?;

    sqlx::query("ALTER TABLE photos ADD CONSTRAINT photos_id_numeric CHECK (flickr_id ~ '^[0-9]+$')")
        .execute(store.pool())
        .await?;

    let records = vec![record("1"), record("not-a-number"), record("3")];
    let outcomes = store.upsert(&records).await?;

    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].is_success());
    assert_eq!(store.count().await?, 2);
    Ok(())
}
