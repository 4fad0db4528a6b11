//! Remote object store.
//!
//! Ingestion downloads source objects through this interface; the mirror and
//! publishing legs upload through it. Every failure surfaces as a
//! [`RemoteStoreError`]; whether that aborts the run is the caller's call
//! (fatal for ingestion, a logged warning everywhere else).

use crate::config::RemoteConfig;
use crate::errors::RemoteStoreError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest, Md5};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for object-store calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An object store addressed by flat object names.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Downloads an object's bytes.
    async fn download(&self, object: &str) -> Result<Vec<u8>, RemoteStoreError>;

    /// Uploads an object, overwriting any previous version.
    async fn upload(&self, object: &str, bytes: &[u8]) -> Result<(), RemoteStoreError>;

    /// Human-readable location for log lines.
    fn location(&self) -> String;
}

/// HTTP object-store client.
///
/// Objects live at `{endpoint}/{bucket}/{prefix}/{object}`. Uploads carry a
/// base64 `Content-MD5` header so the far side can verify integrity.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    prefix: String,
    token: Option<String>,
}

impl HttpObjectStore {
    /// Builds a client from the `[remote]` configuration section.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteStoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let token = match config.token_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(value) => Some(value),
                Err(_) => {
                    return Err(RemoteStoreError::Misconfigured {
                        reason: format!("token environment variable '{var}' is not set"),
                    });
                }
            },
            None => None,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            prefix: config.prefix.trim_matches('/').to_string(),
            token,
        })
    }

    fn object_url(&self, object: &str) -> String {
        let object = object.trim_start_matches('/');
        if self.prefix.is_empty() {
            format!("{}/{}/{}", self.endpoint, self.bucket, object)
        } else {
            format!("{}/{}/{}/{}", self.endpoint, self.bucket, self.prefix, object)
        }
    }
}

#[async_trait]
impl RemoteStore for HttpObjectStore {
    async fn download(&self, object: &str) -> Result<Vec<u8>, RemoteStoreError> {
        let url = self.object_url(object);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteStoreError::Status {
                status: status.as_u16(),
                object: object.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(object = %object, bytes = bytes.len(), "downloaded object");
        Ok(bytes.to_vec())
    }

    async fn upload(&self, object: &str, bytes: &[u8]) -> Result<(), RemoteStoreError> {
        let url = self.object_url(object);
        let mut request = self
            .client
            .put(&url)
            .header("Content-MD5", content_md5(bytes))
            .body(bytes.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteStoreError::Status {
                status: status.as_u16(),
                object: object.to_string(),
            });
        }

        debug!(object = %object, bytes = bytes.len(), "uploaded object");
        Ok(())
    }

    fn location(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }
}

/// Base64 MD5 digest used for the `Content-MD5` header.
#[must_use]
pub fn content_md5(bytes: &[u8]) -> String {
    BASE64.encode(Md5::digest(bytes))
}

/// Uploads one artifact best-effort.
///
/// Mirror failures inside mandatory stages are logged and swallowed here;
/// warnings the caller must surface go through the publishing sinks instead.
pub async fn mirror_artifact(remote: &dyn RemoteStore, object: &str, bytes: &[u8]) {
    match remote.upload(object, bytes).await {
        Ok(()) => debug!(object = %object, remote = %remote.location(), "mirrored artifact"),
        Err(error) => {
            warn!(object = %object, remote = %remote.location(), %error, "artifact mirror failed");
        }
    }
}
