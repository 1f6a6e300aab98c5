use std::io::ErrorKind;
use std::path::PathBuf;

use super::{validate_key, ArtifactStore, StoreError};

/// Local directory laid out as `{root}/{container}/{blob}`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsBlobStore {
    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(container)?;
        validate_key(blob)?;

        let path = self.root.join(container).join(blob);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::info!(
                    path = %path.display(),
                    size_bytes = bytes.len(),
                    store = self.name(),
                    "Blob read"
                );
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                container: container.to_string(),
                blob: blob.to_string(),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
