use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::Value;

use article_recs::api::{create_router, AppState, RequestPolicy};
use article_recs::config::{AnonymousPolicy, InvalidUserIdPolicy};
use article_recs::models::{
    ArticleId, InteractionRecord, RecommendationResult, UserId, PERSONALIZED_MESSAGE,
    POPULAR_MESSAGE, WELCOME_MESSAGE,
};
use article_recs::services::{build_rating_table, Recommender, ScoreError, Scorer, SvdModel};

fn sessions(user_id: UserId, article_id: ArticleId, count: i64) -> Vec<InteractionRecord> {
    (0..count)
        .map(|session| InteractionRecord::new(user_id, article_id, user_id * 1000 + session))
        .collect()
}

// Articles 10 and 30 are read by two users each, 20 by one.
fn test_records() -> Vec<InteractionRecord> {
    [
        sessions(1, 10, 3),
        sessions(1, 20, 1),
        sessions(2, 10, 2),
        sessions(2, 30, 1),
        sessions(3, 30, 2),
    ]
    .concat()
}

// User 1 prefers 20 (0.8), then 30 (0.7), then 10 (0.6).
fn test_model() -> SvdModel {
    SvdModel::new(0.5, (0.0, 1.0), 1)
        .with_user(1, 0.0, vec![1.0])
        .with_item(10, 0.0, vec![0.1])
        .with_item(20, 0.0, vec![0.3])
        .with_item(30, 0.0, vec![0.2])
}

struct FailingScorer;

impl Scorer for FailingScorer {
    fn predict(&self, _user_id: UserId, _article_id: ArticleId) -> Result<f64, ScoreError> {
        Err(ScoreError::NonFinite {
            what: "estimate".to_string(),
        })
    }
}

fn recommender_with(model: Arc<dyn Scorer>) -> Recommender {
    let table = build_rating_table(&test_records()).unwrap();
    Recommender::new(model, table)
}

fn create_test_server_with(state: AppState) -> TestServer {
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    create_test_server_with(AppState::ready(
        recommender_with(Arc::new(test_model())),
        RequestPolicy::default(),
    ))
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_known_user_gets_model_ranking() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.user_id, Some(1));
    assert_eq!(result.recommendations, vec![20, 30, 10]);
    assert_eq!(result.message, PERSONALIZED_MESSAGE);
}

#[tokio::test]
async fn test_n_limits_the_ranking() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .add_query_param("n", 2)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.recommendations, vec![20, 30]);
}

#[tokio::test]
async fn test_zero_n_returns_empty_list() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .add_query_param("n", 0)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert!(result.recommendations.is_empty());
}

#[tokio::test]
async fn test_n_above_maximum_is_rejected() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .add_query_param("n", 1000)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "n must be at most 100");
}

#[tokio::test]
async fn test_unknown_user_gets_popular_articles() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 99)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.user_id, Some(99));
    assert_eq!(result.recommendations, vec![10, 30, 20]);
    assert_eq!(result.message, PERSONALIZED_MESSAGE);
}

#[tokio::test]
async fn test_anonymous_visitor_gets_welcome() {
    let server = create_test_server();

    let response = server.get("/recommendations").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user_id"], Value::Null);
    assert_eq!(body["recommendations"], serde_json::json!([]));
    assert_eq!(body["message"], WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_empty_user_id_is_anonymous() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "")
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result, RecommendationResult::welcome());
}

#[tokio::test]
async fn test_anonymous_visitor_gets_popular_when_configured() {
    let policy = RequestPolicy {
        anonymous: AnonymousPolicy::Popular,
        ..RequestPolicy::default()
    };
    let server = create_test_server_with(AppState::ready(
        recommender_with(Arc::new(test_model())),
        policy,
    ));

    let response = server.get("/recommendations").await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.user_id, None);
    assert_eq!(result.recommendations, vec![10, 30, 20]);
    assert_eq!(result.message, POPULAR_MESSAGE);
}

#[tokio::test]
async fn test_malformed_user_id_is_rejected_by_default() {
    let server = create_test_server();

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "abc")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "user_id must be an integer, got \"abc\"");
}

#[tokio::test]
async fn test_malformed_user_id_can_be_treated_as_anonymous() {
    let policy = RequestPolicy {
        anonymous: AnonymousPolicy::Popular,
        invalid_user_id: InvalidUserIdPolicy::Anonymous,
        ..RequestPolicy::default()
    };
    let server = create_test_server_with(AppState::ready(
        recommender_with(Arc::new(test_model())),
        policy,
    ));

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "abc")
        .add_query_param("n", 1)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.user_id, None);
    assert_eq!(result.recommendations, vec![10]);
}

#[tokio::test]
async fn test_scoring_failure_is_internal_error() {
    let server = create_test_server_with(AppState::ready(
        recommender_with(Arc::new(FailingScorer)),
        RequestPolicy::default(),
    ));

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("failed to score article"), "unexpected error: {}", message);
    assert!(message.contains("non-finite estimate"), "unexpected error: {}", message);
}

#[tokio::test]
async fn test_scoring_failure_does_not_affect_unknown_users() {
    let server = create_test_server_with(AppState::ready(
        recommender_with(Arc::new(FailingScorer)),
        RequestPolicy::default(),
    ));

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 99)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result.recommendations, vec![10, 30, 20]);
}

#[tokio::test]
async fn test_degraded_mode_always_welcomes() {
    let server = create_test_server_with(AppState::degraded(RequestPolicy::default()));

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", 1)
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result, RecommendationResult::welcome());

    let health = server.get("/health").await;
    health.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_degraded_mode_ignores_malformed_parameters() {
    let server = create_test_server_with(AppState::degraded(RequestPolicy::default()));

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "abc")
        .add_query_param("n", "abc")
        .await;

    response.assert_status_ok();
    let result: RecommendationResult = response.json();
    assert_eq!(result, RecommendationResult::welcome());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("gw-1234"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), "gw-1234");
}
