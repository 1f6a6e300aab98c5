use crate::config::{AnonymousPolicy, Config, InvalidUserIdPolicy, StartupPolicy};
use crate::models::DEFAULT_RECOMMENDATIONS;
use crate::services::loader::StartupError;
use crate::services::recommender::Recommender;

/// Whether the artifacts were loaded at startup
#[derive(Clone)]
pub enum ServingMode {
    Ready(Recommender),
    /// Startup failed and the process was configured to keep serving
    Degraded,
}

/// Per-request behaviour chosen at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    pub default_recommendations: usize,
    pub max_recommendations: usize,
    pub anonymous: AnonymousPolicy,
    pub invalid_user_id: InvalidUserIdPolicy,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            default_recommendations: DEFAULT_RECOMMENDATIONS,
            max_recommendations: 100,
            anonymous: AnonymousPolicy::default(),
            invalid_user_id: InvalidUserIdPolicy::default(),
        }
    }
}

impl From<&Config> for RequestPolicy {
    fn from(config: &Config) -> Self {
        Self {
            default_recommendations: config.default_recommendations,
            max_recommendations: config.max_recommendations,
            anonymous: config.anonymous_policy,
            invalid_user_id: config.invalid_user_id_policy,
        }
    }
}

/// Shared application state
///
/// Everything in here is read-only after startup, so handlers share it
/// without locking.
#[derive(Clone)]
pub struct AppState {
    pub mode: ServingMode,
    pub policy: RequestPolicy,
}

impl AppState {
    /// State for a service whose model and rating table loaded successfully
    pub fn ready(recommender: Recommender, policy: RequestPolicy) -> Self {
        Self {
            mode: ServingMode::Ready(recommender),
            policy,
        }
    }

    /// State for a service that failed to load and serves welcome responses only
    pub fn degraded(policy: RequestPolicy) -> Self {
        Self {
            mode: ServingMode::Degraded,
            policy,
        }
    }

    /// Applies the startup policy to the outcome of loading the artifacts
    ///
    /// `FailFast` hands the error back so the process exits; `Degraded` logs
    /// it and serves welcome responses instead.
    pub fn from_startup(
        loaded: Result<Recommender, StartupError>,
        startup: StartupPolicy,
        policy: RequestPolicy,
    ) -> Result<Self, StartupError> {
        match (loaded, startup) {
            (Ok(recommender), _) => Ok(Self::ready(recommender, policy)),
            (Err(e), StartupPolicy::FailFast) => Err(e),
            (Err(e), StartupPolicy::Degraded) => {
                tracing::error!(error = %e, "Artifacts unavailable, serving in degraded mode");
                Ok(Self::degraded(policy))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.mode, ServingMode::Ready(_))
    }
}
