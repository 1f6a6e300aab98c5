use serde::Deserialize;
use std::time::Duration;

use crate::services::loader::ArtifactKeys;

/// What to do when the model or dataset cannot be loaded at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    /// Exit with an error; the service never accepts traffic
    #[default]
    FailFast,
    /// Serve the welcome response to every request until restarted
    Degraded,
}

/// How a request without `user_id` is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousPolicy {
    /// Sign-up message and no recommendations
    #[default]
    Welcome,
    /// Most popular articles
    Popular,
}

/// How a `user_id` that is not an integer is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvalidUserIdPolicy {
    /// 400 with an error body
    #[default]
    Reject,
    /// Treated like a missing `user_id`
    Anonymous,
}

/// Where the startup artifacts are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Http {
        base_url: String,
        sas_token: Option<String>,
    },
    Filesystem {
        root: String,
    },
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the HTTP object store holding the artifacts
    #[serde(default)]
    pub artifact_store_url: Option<String>,

    /// Shared access signature appended to object store requests
    #[serde(default)]
    pub artifact_store_sas_token: Option<String>,

    /// Local directory holding the artifacts, used when no store URL is set
    #[serde(default)]
    pub artifact_dir: Option<String>,

    #[serde(default = "default_artifact_container")]
    pub artifact_container: String,

    #[serde(default = "default_model_blob")]
    pub model_blob: String,

    #[serde(default = "default_dataset_blob")]
    pub dataset_blob: String,

    /// Object store request timeout in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Number of recommendations when the request does not specify `n`
    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,

    /// Largest `n` a request may ask for
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    #[serde(default)]
    pub startup_policy: StartupPolicy,

    #[serde(default)]
    pub anonymous_policy: AnonymousPolicy,

    #[serde(default)]
    pub invalid_user_id_policy: InvalidUserIdPolicy,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_artifact_container() -> String {
    "model-storage".to_string()
}

fn default_model_blob() -> String {
    "svd_model.json".to_string()
}

fn default_dataset_blob() -> String {
    "interactions.jsonl.zst".to_string()
}

fn default_store_timeout_secs() -> u64 {
    30
}

fn default_recommendations() -> usize {
    crate::models::DEFAULT_RECOMMENDATIONS
}

fn default_max_recommendations() -> usize {
    100
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_recommendations > self.max_recommendations {
            anyhow::bail!(
                "DEFAULT_RECOMMENDATIONS ({}) exceeds MAX_RECOMMENDATIONS ({})",
                self.default_recommendations,
                self.max_recommendations
            );
        }
        self.store_backend()?;
        Ok(())
    }

    /// The configured artifact store; a store URL takes precedence over a directory
    pub fn store_backend(&self) -> anyhow::Result<StoreBackend> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty(&self.artifact_store_url) {
            return Ok(StoreBackend::Http {
                base_url,
                sas_token: non_empty(&self.artifact_store_sas_token),
            });
        }
        if let Some(root) = non_empty(&self.artifact_dir) {
            return Ok(StoreBackend::Filesystem { root });
        }
        anyhow::bail!("Either ARTIFACT_STORE_URL or ARTIFACT_DIR must be set")
    }

    pub fn artifact_keys(&self) -> ArtifactKeys {
        ArtifactKeys {
            container: self.artifact_container.clone(),
            model_blob: self.model_blob.clone(),
            dataset_blob: self.dataset_blob.clone(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
