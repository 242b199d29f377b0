//! Storage capabilities for uploaded artifacts.
//!
//! The artifact manager talks to three collaborators:
//! - `ImageSource`: downloads image bytes from the photo host
//! - `ObjectStore`: binary objects (image bytes), returns a public URL
//! - `RecordStore`: relational rows keyed by photo identifier

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::{PersistResult, UploadResult};
use crate::types::record::{ImageRecord, UploadOutcome};

/// Image bytes plus the content type reported by the host.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl ImageBytes {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Downloads image bytes from a source URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn download(&self, url: &str) -> UploadResult<ImageBytes>;
}

/// Binary object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `image` under `key` and return its public URL.
    async fn put(&self, key: &str, image: ImageBytes) -> UploadResult<String>;

    /// Public URL an object under `key` would have.
    fn public_url(&self, key: &str) -> String;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn put(&self, key: &str, image: ImageBytes) -> UploadResult<String> {
        (**self).put(key, image).await
    }

    fn public_url(&self, key: &str) -> String {
        (**self).public_url(key)
    }
}

/// Relational store for finished records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or update every record, keyed by identifier.
    ///
    /// Returns one outcome per input record. Returns `Err` only when the
    /// store is unreachable or rejects the batch as a whole.
    async fn upsert(&self, records: &[ImageRecord]) -> PersistResult<Vec<UploadOutcome>>;
}
