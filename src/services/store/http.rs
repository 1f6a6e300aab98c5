//! HTTP object store
//!
//! Blobs are fetched with `GET {base_url}/{container}/{blob}`. When a shared
//! access signature is configured it is appended as the query string, which
//! is how Azure Blob Storage authorizes anonymous-style downloads.

use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;

use super::{validate_key, ArtifactStore, StoreError};

#[derive(Clone)]
pub struct HttpBlobStore {
    http_client: HttpClient,
    base_url: String,
    sas_token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(
        base_url: impl Into<String>,
        sas_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sas_token: sas_token
                .map(|token| token.trim_start_matches('?').to_string())
                .filter(|token| !token.is_empty()),
        })
    }

    fn blob_url(&self, container: &str, blob: &str) -> String {
        match &self.sas_token {
            Some(token) => format!("{}/{}/{}?{}", self.base_url, container, blob, token),
            None => format!("{}/{}/{}", self.base_url, container, blob),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for HttpBlobStore {
    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(container)?;
        validate_key(blob)?;

        tracing::debug!(container, blob, store = self.name(), "Fetching blob");

        let response = self
            .http_client
            .get(self.blob_url(container, blob))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                container: container.to_string(),
                blob: blob.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "object store returned status {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await?;

        tracing::info!(
            container,
            blob,
            size_bytes = bytes.len(),
            store = self.name(),
            "Blob fetched"
        );

        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
