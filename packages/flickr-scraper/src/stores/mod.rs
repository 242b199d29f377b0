//! Store implementations.
//!
//! Available backends:
//! - `MemoryObjectStore` / `MemoryRecordStore` - in-memory (always available)
//! - `HttpObjectStore` - bucket behind a bearer-token HTTP gateway
//! - `S3ObjectStore` - SigV4-signed S3 writes (requires `s3` feature)
//! - `PostgresRecordStore` - the `photos` table (requires `postgres` feature)

pub mod http_object;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "s3")]
pub mod s3;

pub use crate::types::config::ObjectStoreConfig;
pub use http_object::HttpObjectStore;
pub use memory::{MemoryObjectStore, MemoryRecordStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;

#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Object store for `config`: the HTTP gateway when a token is set,
/// signed S3 otherwise.
#[cfg(feature = "s3")]
pub async fn connect_object_store(
    config: ObjectStoreConfig,
) -> crate::error::UploadResult<std::sync::Arc<dyn crate::traits::store::ObjectStore>> {
    if config.uses_gateway() {
        Ok(std::sync::Arc::new(HttpObjectStore::new(config)?))
    } else {
        Ok(std::sync::Arc::new(S3ObjectStore::new(config).await?))
    }
}
