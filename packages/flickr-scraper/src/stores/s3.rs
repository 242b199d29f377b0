//! Amazon S3 (or any SigV4-compatible endpoint) through the AWS SDK.
//!
//! Credentials and region come from the standard AWS chain: environment
//! variables, shared profile, or instance role.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::debug;

use crate::error::{UploadError, UploadResult};
use crate::traits::store::{ImageBytes, ObjectStore};
use crate::types::config::ObjectStoreConfig;

/// Signed S3 object store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    config: ObjectStoreConfig,
}

impl S3ObjectStore {
    /// Load AWS configuration and build a client for `config.bucket`.
    pub async fn new(config: ObjectStoreConfig) -> UploadResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(UploadError::Configuration {
                reason: "bucket name is empty".to_string(),
            });
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        if shared.region().is_none() {
            return Err(UploadError::Configuration {
                reason: "no AWS region configured (set AWS_REGION or OBJECT_STORE_REGION)"
                    .to_string(),
            });
        }

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint.as_str()).force_path_style(true);
        }

        Ok(Self::from_client(
            aws_sdk_s3::Client::from_conf(builder.build()),
            config,
        ))
    }

    /// Use an already configured SDK client.
    pub fn from_client(client: aws_sdk_s3::Client, config: ObjectStoreConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, image: ImageBytes) -> UploadResult<String> {
        let ImageBytes {
            bytes,
            content_type,
        } = image;
        let size = bytes.len();

        let mut request = self
            .client
            .put_object()
            .bucket(self.config.bucket.as_str())
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type.unwrap_or_else(|| "application/octet-stream".to_string()));

        if let Some(acl) = &self.config.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        request
            .send()
            .await
            .map_err(|e| UploadError::StoreWrite {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(key, bytes = size, bucket = %self.config.bucket, "Stored object in S3");
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}
