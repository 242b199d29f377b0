//! Moving scraped records into the object and relational stores.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::error::{PersistError, PersistResult, UploadError, UploadResult};
use crate::extractor::urls::file_extension;
use crate::traits::store::{ImageSource, ObjectStore, RecordStore};
use crate::types::config::UploadConfig;
use crate::types::record::{ImageRecord, UploadOutcome};

/// Uploads image bytes and persists records.
///
/// Either side is optional so a caller can upload without a database or
/// persist without an object store.
///
/// # Example
///
/// ```rust,ignore
/// let manager = ArtifactManager::new(UploadConfig::default())
///     .with_uploads(HttpImageSource::new(&config)?, connect_object_store(store_config).await?)
///     .with_record_store(PostgresRecordStore::new(&database_url).await?);
///
/// let uploads = manager.upload_to_store(&mut outcome.records).await;
/// let persisted = manager.persist(&outcome.records).await?;
/// ```
pub struct ArtifactManager {
    source: Option<Arc<dyn ImageSource>>,
    objects: Option<Arc<dyn ObjectStore>>,
    records: Option<Arc<dyn RecordStore>>,
    config: UploadConfig,
}

impl ArtifactManager {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            source: None,
            objects: None,
            records: None,
            config,
        }
    }

    /// Set the image source and object store used by [`Self::upload_to_store`].
    pub fn with_uploads(
        mut self,
        source: impl ImageSource + 'static,
        objects: impl ObjectStore + 'static,
    ) -> Self {
        self.source = Some(Arc::new(source));
        self.objects = Some(Arc::new(objects));
        self
    }

    /// Set the relational store used by [`Self::persist`].
    pub fn with_record_store(mut self, store: impl RecordStore + 'static) -> Self {
        self.records = Some(Arc::new(store));
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// `{prefix}{identifier}.{extension}`, falling back to the default extension.
    pub fn object_key(&self, record: &ImageRecord) -> String {
        let extension = file_extension(&record.source_url)
            .unwrap_or_else(|| self.config.default_extension.clone());
        format!("{}{}.{}", self.config.key_prefix, record.identifier, extension)
    }

    /// Upload every record's image and set `store_url` on success.
    ///
    /// Returns one outcome per record, in input order. A failed record keeps
    /// its previous `store_url` and never stops the others.
    pub async fn upload_to_store(&self, records: &mut [ImageRecord]) -> Vec<UploadOutcome> {
        let (Some(source), Some(objects)) = (&self.source, &self.objects) else {
            warn!(records = records.len(), "No object store configured, skipping upload");
            return records
                .iter()
                .map(|r| UploadOutcome::failed(&r.identifier, "no object store configured"))
                .collect();
        };

        info!(
            records = records.len(),
            workers = self.config.workers,
            "Uploading images"
        );

        let mut results: Vec<(usize, UploadResult<String>)> = stream::iter(records.iter().enumerate())
            .map(|(index, record)| {
                let key = self.object_key(record);
                async move {
                    let result = upload_one(source.as_ref(), objects.as_ref(), record, &key).await;
                    (index, result)
                }
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let mut outcomes = Vec::with_capacity(records.len());
        for (index, result) in results {
            let record = &mut records[index];
            match result {
                Ok(url) => {
                    record.store_url = Some(url.clone());
                    outcomes.push(UploadOutcome::succeeded(&record.identifier, Some(url)));
                }
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Upload failed");
                    outcomes.push(UploadOutcome::failed(&record.identifier, e));
                }
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            uploaded = outcomes.len() - failed,
            failed, "Upload complete"
        );

        outcomes
    }

    /// Upsert every record into the relational store, keyed by identifier.
    ///
    /// Per-record failures come back as failed outcomes. The call itself
    /// fails only when the store is unreachable or rejects the batch.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn persist(&self, records: &[ImageRecord]) -> PersistResult<Vec<UploadOutcome>> {
        let Some(store) = &self.records else {
            return Err(PersistError::Connection("no record store configured".into()));
        };

        if records.is_empty() {
            return Ok(Vec::new());
        }

        match store.upsert(records).await {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                info!(persisted = outcomes.len() - failed, failed, "Persist complete");
                Ok(outcomes)
            }
            Err(e) => {
                error!(error = %e, "Persist aborted");
                Err(e)
            }
        }
    }
}

async fn upload_one(
    source: &dyn ImageSource,
    objects: &dyn ObjectStore,
    record: &ImageRecord,
    key: &str,
) -> UploadResult<String> {
    let image = source.download(&record.source_url).await?;
    if image.is_empty() {
        return Err(UploadError::Download {
            url: record.source_url.clone(),
            reason: "empty response body".to_string(),
        });
    }
    objects.put(key, image).await
}
