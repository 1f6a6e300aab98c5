use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::task::JoinError;

use crate::models::InteractionRecord;
use crate::services::interactions::{build_rating_table, BuildError};
use crate::services::recommender::Recommender;
use crate::services::scoring::{ScoreError, SvdModel};
use crate::services::store::{ArtifactStore, StoreError};

/// First four bytes of every zstd frame
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Why the bytes of an artifact could not be turned into a value
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("zstd: {0}")]
    Zstd(#[source] std::io::Error),

    #[error("gzip: {0}")]
    Gzip(#[source] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading an artifact
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch {blob}: {source}")]
    Fetch {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to decode {blob}: {source}")]
    Decode {
        blob: String,
        #[source]
        source: DecodeError,
    },

    #[error("decoder for {blob} did not complete: {source}")]
    DecodeTask {
        blob: String,
        #[source]
        source: JoinError,
    },

    #[error("invalid model in {blob}: {source}")]
    InvalidModel {
        blob: String,
        #[source]
        source: ScoreError,
    },
}

/// Anything that prevents the service from becoming ready
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to build rating table: {0}")]
    Build(#[from] BuildError),

    #[error("rating table build did not complete: {0}")]
    BuildTask(#[source] JoinError),
}

/// Location of the two startup artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub container: String,
    pub model_blob: String,
    pub dataset_blob: String,
}

/// Downloads and decodes the model and the interaction dataset
///
/// Each call fetches again; the caller keeps the decoded values for the life
/// of the process.
pub struct ArtifactLoader {
    store: Arc<dyn ArtifactStore>,
    keys: ArtifactKeys,
}

impl ArtifactLoader {
    pub fn new(store: Arc<dyn ArtifactStore>, keys: ArtifactKeys) -> Self {
        Self { store, keys }
    }

    /// Fetches, decodes and validates the scoring model
    pub async fn load_model(&self) -> Result<SvdModel, LoadError> {
        let blob = self.keys.model_blob.clone();
        let bytes = self.fetch(&blob).await?;

        let model: SvdModel = decode_blocking(blob.clone(), bytes, decode_json).await?;
        model
            .validate()
            .map_err(|source| LoadError::InvalidModel { blob, source })?;

        tracing::info!(
            users = model.users.len(),
            articles = model.items.len(),
            factors = model.n_factors,
            "Scoring model loaded"
        );

        Ok(model)
    }

    /// Fetches and decodes the raw interaction records
    pub async fn load_dataset(&self) -> Result<Vec<InteractionRecord>, LoadError> {
        let blob = self.keys.dataset_blob.clone();
        let bytes = self.fetch(&blob).await?;

        let records: Vec<InteractionRecord> = decode_blocking(blob, bytes, decode_records).await?;

        tracing::info!(records = records.len(), "Interaction dataset loaded");

        Ok(records)
    }

    /// Loads both artifacts and derives the rating table
    pub async fn load_recommender(&self) -> Result<Recommender, StartupError> {
        let (model, records) = tokio::try_join!(self.load_model(), self.load_dataset())?;

        let table = tokio::task::spawn_blocking(move || build_rating_table(&records))
            .await
            .map_err(StartupError::BuildTask)??;

        Ok(Recommender::new(Arc::new(model), table))
    }

    async fn fetch(&self, blob: &str) -> Result<Vec<u8>, LoadError> {
        self.store
            .fetch(&self.keys.container, blob)
            .await
            .map_err(|source| {
                tracing::error!(
                    error = %source,
                    container = %self.keys.container,
                    blob,
                    store = self.store.name(),
                    "Artifact fetch failed"
                );
                LoadError::Fetch {
                    blob: blob.to_string(),
                    source,
                }
            })
    }
}

/// Runs a CPU-bound decoder off the async workers
async fn decode_blocking<T, F>(blob: String, bytes: Vec<u8>, decode: F) -> Result<T, LoadError>
where
    T: Send + 'static,
    F: FnOnce(&[u8]) -> Result<T, DecodeError> + Send + 'static,
{
    let decoded = tokio::task::spawn_blocking(move || {
        let bytes = decompress(&bytes)?;
        decode(&*bytes)
    })
    .await;

    match decoded {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(LoadError::Decode { blob, source }),
        Err(source) => Err(LoadError::DecodeTask { blob, source }),
    }
}

/// Inflates zstd or gzip artifacts, passes anything else through
fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if bytes.starts_with(&ZSTD_MAGIC) {
        zstd::decode_all(bytes)
            .map(Cow::Owned)
            .map_err(DecodeError::Zstd)
    } else if bytes.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Gzip)?;
        Ok(Cow::Owned(inflated))
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Accepts either a JSON array of records or JSON Lines
fn decode_records(bytes: &[u8]) -> Result<Vec<InteractionRecord>, DecodeError> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        return decode_json(bytes);
    }

    let mut records = Vec::new();
    for (idx, line) in bytes.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        let record = serde_json::from_slice(line)
            .map_err(|source| DecodeError::Line { line: idx + 1, source })?;
        records.push(record);
    }
    Ok(records)
}
