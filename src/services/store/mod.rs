//! Artifact store abstraction
//!
//! The recommender only needs to download two named blobs at startup: the
//! trained model and the interaction dataset. Stores are addressed by a
//! container name plus a blob name, which maps directly onto object stores
//! such as Azure Blob Storage and onto a plain directory layout for local runs.

use thiserror::Error;

pub mod fs;
pub mod http;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;

/// Errors raised while fetching a blob
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob {container}/{blob} not found")]
    NotFound { container: String, blob: String },

    #[error("invalid blob key {0:?}")]
    InvalidKey(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only access to named byte blobs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Downloads the whole blob `blob` from `container`
    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Rejects keys that could escape their container when joined into a path or URL
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let escapes = key
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if key.is_empty() || escapes {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
