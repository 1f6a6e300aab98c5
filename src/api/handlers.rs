use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{AnonymousPolicy, InvalidUserIdPolicy};
use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{RecommendationResult, UserId};

use super::state::{AppState, RequestPolicy, ServingMode};

// Request types

/// Query string of `GET /recommendations`
///
/// Both parameters are taken as raw strings so malformed values go through
/// the configured policies instead of the extractor's rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: Option<String>,
    pub n: Option<String>,
}

/// Resolves the raw `user_id` parameter; empty means absent
fn parse_user_id(raw: Option<&str>, policy: InvalidUserIdPolicy) -> AppResult<Option<UserId>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    match raw.parse::<UserId>() {
        Ok(user_id) => Ok(Some(user_id)),
        Err(_) => match policy {
            InvalidUserIdPolicy::Reject => Err(AppError::InvalidInput(format!(
                "user_id must be an integer, got {:?}",
                raw
            ))),
            InvalidUserIdPolicy::Anonymous => {
                tracing::warn!(user_id = raw, "Ignoring malformed user_id");
                Ok(None)
            }
        },
    }
}

/// Resolves the raw `n` parameter against the configured default and ceiling
fn parse_count(raw: Option<&str>, policy: &RequestPolicy) -> AppResult<usize> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(policy.default_recommendations),
        Some(raw) => raw,
    };

    let n: usize = raw.parse().map_err(|_| {
        AppError::InvalidInput(format!("n must be a non-negative integer, got {:?}", raw))
    })?;

    if n > policy.max_recommendations {
        return Err(AppError::InvalidInput(format!(
            "n must be at most {}",
            policy.max_recommendations
        )));
    }
    Ok(n)
}

// Handlers

/// Health check endpoint; reports 503 while serving in degraded mode
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
    }
}

/// Recommend articles for the requesting user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResult>> {
    let recommender = match &state.mode {
        ServingMode::Ready(recommender) => recommender.clone(),
        ServingMode::Degraded => {
            tracing::warn!(request_id = %request_id, "Serving degraded response");
            return Ok(Json(RecommendationResult::welcome()));
        }
    };

    let n = parse_count(params.n.as_deref(), &state.policy)?;
    let user_id = parse_user_id(params.user_id.as_deref(), state.policy.invalid_user_id)?;

    tracing::info!(
        request_id = %request_id,
        user_id = ?user_id,
        n,
        "Processing recommendation request"
    );

    let result = match user_id {
        None => match state.policy.anonymous {
            AnonymousPolicy::Welcome => RecommendationResult::welcome(),
            AnonymousPolicy::Popular => RecommendationResult::popular(recommender.popular(n)),
        },
        Some(user_id) => tokio::task::spawn_blocking(move || recommender.result_for(user_id, n))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??,
    };

    tracing::info!(
        request_id = %request_id,
        returned = result.recommendations.len(),
        "Recommendations served"
    );

    Ok(Json(result))
}
