//! Object store behind an HTTP gateway.
//!
//! Objects are written as `PUT {endpoint}/{bucket}/{key}` with a bearer
//! token. The gateway (or a bucket policy that admits the caller) does the
//! S3 signing; for direct AWS writes use [`super::S3ObjectStore`].
//! Each write carries an `x-amz-acl` header so the object is publicly
//! readable, and the returned URL is `{public_base_url}/{key}`.

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;

use crate::error::{UploadError, UploadResult};
use crate::traits::store::{ImageBytes, ObjectStore};
use crate::types::config::ObjectStoreConfig;

/// Gateway object store client.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    config: ObjectStoreConfig,
}

impl HttpObjectStore {
    /// Requires `config.endpoint`; a gateway has no default address.
    pub fn new(config: ObjectStoreConfig) -> UploadResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| UploadError::Configuration {
                reason: "a gateway endpoint is required for token-authenticated writes".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Configuration {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// URL an object is written to.
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.config.bucket,
            key.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, image: ImageBytes) -> UploadResult<String> {
        let url = self.object_url(key);
        let store_error = |reason: String| UploadError::StoreWrite {
            key: key.to_string(),
            reason,
        };

        let content_type = image
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size = image.len();

        let mut request = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, content_type)
            .body(image.bytes);

        if let Some(acl) = &self.config.acl {
            request = request.header("x-amz-acl", acl);
        }
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| store_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(store_error(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        debug!(key, bytes = size, "Stored object via gateway");
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}
