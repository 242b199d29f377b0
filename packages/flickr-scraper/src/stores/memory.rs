//! In-memory stores for testing and development.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{PersistError, PersistResult, UploadError, UploadResult};
use crate::traits::store::{ImageBytes, ObjectStore, RecordStore};
use crate::types::record::{ImageRecord, UploadOutcome};

/// Object store backed by a map.
///
/// Clones share the same objects, so a test can keep a handle after
/// moving the store into an `ArtifactManager`.
#[derive(Clone)]
pub struct MemoryObjectStore {
    public_base_url: String,
    objects: Arc<RwLock<HashMap<String, ImageBytes>>>,
    failing_keys: Arc<RwLock<HashSet<String>>>,
}

impl MemoryObjectStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            failing_keys: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Reject every write to `key`.
    pub fn with_failing_key(self, key: impl Into<String>) -> Self {
        self.failing_keys.write().unwrap().insert(key.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<ImageBytes> {
        self.objects.read().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, image: ImageBytes) -> UploadResult<String> {
        if self.failing_keys.read().unwrap().contains(key) {
            return Err(UploadError::StoreWrite {
                key: key.to_string(),
                reason: "write rejected".to_string(),
            });
        }
        self.objects.write().unwrap().insert(key.to_string(), image);
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Record store backed by a map keyed by identifier.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    rows: Arc<RwLock<HashMap<String, ImageRecord>>>,
    rejected: Arc<RwLock<HashSet<String>>>,
    unavailable: Arc<AtomicBool>,
    upsert_calls: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `identifier` with a constraint violation.
    pub fn with_rejected(self, identifier: impl Into<String>) -> Self {
        self.rejected.write().unwrap().insert(identifier.into());
        self
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get(&self, identifier: &str) -> Option<ImageRecord> {
        self.rows.read().unwrap().get(identifier).cloned()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(&self, records: &[ImageRecord]) -> PersistResult<Vec<UploadOutcome>> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistError::Connection("memory store unavailable".into()));
        }

        let rejected = self.rejected.read().unwrap();
        let mut rows = self.rows.write().unwrap();

        let outcomes = records
            .iter()
            .map(|record| {
                if rejected.contains(&record.identifier) {
                    let violation = PersistError::Constraint {
                        identifier: record.identifier.clone(),
                        message: "rejected by store".to_string(),
                    };
                    return UploadOutcome::failed(&record.identifier, violation);
                }
                rows.insert(record.identifier.clone(), record.clone());
                UploadOutcome::succeeded(&record.identifier, record.store_url.clone())
            })
            .collect();

        Ok(outcomes)
    }
}
