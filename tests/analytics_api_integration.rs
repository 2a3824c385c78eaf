//! Integration tests for the analytics HTTP endpoints
//!
//! These drive the axum router with `oneshot` requests against the in-memory
//! store and check the wire shape and status mapping of every read.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use insite::analytics::AnalyticsService;
use insite::api::{create_api_router, MEMBER_ID_HEADER};
use insite::auth::AccessGuard;
use insite::models::{fields, Table};
use insite::query::{Query, ABNORMAL_MEASUREMENT, DATA_MEASUREMENT};
use insite::storage::{EventStore, MemoryStore, Point, StoreError, StoreResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "app-token";

/// Helper to create a router over seeded in-memory data
fn create_test_app() -> Router {
    let store = MemoryStore::new();
    let t = |secs: i64| Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();

    for (secs, before, current, rt) in [
        (0, "/", "/home", 120),
        (1, "/", "/home", 80),
        (2, "/google", "/docs", 200),
        (3, "/", "/home", 100),
    ] {
        store.insert(
            Point::new(DATA_MEASUREMENT, t(secs))
                .tag(fields::APPLICATION_TOKEN, TOKEN)
                .tag(fields::BEFORE_URL, before)
                .tag(fields::CURRENT_URL, current)
                .field(fields::RESPONSE_TIME, rt),
        );
    }
    for (secs, read) in [(1, "false"), (2, "false"), (3, "true")] {
        store.insert(
            Point::new(ABNORMAL_MEASUREMENT, t(secs))
                .tag(fields::APPLICATION_TOKEN, TOKEN)
                .field(fields::IS_READ, read),
        );
    }

    app_with_store(Arc::new(store))
}

fn app_with_store(store: Arc<dyn EventStore>) -> Router {
    let analytics = AnalyticsService::new(store, Arc::new(AccessGuard::allow_all()), "insite");
    create_api_router(analytics)
}

fn read_request(path: &str, member_id: Option<&str>, token: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/data/{path}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = member_id {
        builder = builder.header(MEMBER_ID_HEADER, id);
    }
    builder
        .body(Body::from(json!({ "applicationToken": token }).to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

struct BrokenStore;

#[async_trait]
impl EventStore for BrokenStore {
    async fn execute(&self, _query: &Query) -> StoreResult<Vec<Table>> {
        Err(StoreError::Query("error in query specification".to_string()))
    }

    async fn health(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct DownStore;

#[async_trait]
impl EventStore for DownStore {
    async fn execute(&self, _query: &Query) -> StoreResult<Vec<Table>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn health(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(create_test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn test_response_time_endpoint() {
    let (status, body) = send(
        create_test_app(),
        read_request("response-time", Some("1"), TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["responseTime"].as_f64().unwrap(), 125.0);
}

#[tokio::test]
async fn test_referrer_endpoint() {
    let (status, body) = send(create_test_app(), read_request("referrer", Some("1"), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let list = body["referrerDtoList"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    let root = list.iter().find(|e| e["referrer"] == "/").unwrap();
    assert_eq!(root["count"], 3);
    assert_eq!(root["percentage"].as_f64().unwrap(), 0.75);
    let google = list.iter().find(|e| e["referrer"] == "/google").unwrap();
    assert_eq!(google["count"], 1);
}

#[tokio::test]
async fn test_user_count_endpoint() {
    let (status, body) = send(
        create_test_app(),
        read_request("user-count", Some("1"), TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let list = body["userCountDtoList"].as_array().unwrap();
    let home = list.iter().find(|e| e["currentPage"] == "/home").unwrap();
    assert_eq!(home["count"], 3);
    let total: f64 = list.iter().map(|e| e["percentage"].as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_abnormal_endpoint() {
    let (status, body) = send(create_test_app(), read_request("abnormal", Some("1"), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["abnormal"], true);
}

#[tokio::test]
async fn test_no_data_is_not_found() {
    let (status, body) = send(
        create_test_app(),
        read_request("response-time", Some("1"), "unknown"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no data"));

    let (status, _) = send(
        create_test_app(),
        read_request("abnormal", Some("1"), "unknown"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_distribution_is_ok() {
    let (status, body) = send(
        create_test_app(),
        read_request("referrer", Some("1"), "unknown"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["referrerDtoList"], json!([]));
}

#[tokio::test]
async fn test_store_errors_map_to_gateway_statuses() {
    let (status, _) = send(
        app_with_store(Arc::new(DownStore)),
        read_request("response-time", Some("1"), TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        app_with_store(Arc::new(BrokenStore)),
        read_request("referrer", Some("1"), TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_request_validation() {
    let (status, _) = send(create_test_app(), read_request("abnormal", None, TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        create_test_app(),
        read_request("abnormal", Some("not-a-number"), TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for body in [json!({}), json!({ "applicationToken": null })] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/data/abnormal")
            .header(header::CONTENT_TYPE, "application/json")
            .header(MEMBER_ID_HEADER, "1")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = send(create_test_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "applicationToken is required");
    }
}

#[tokio::test]
async fn test_empty_token_reaches_the_store() {
    // an empty token is a valid request that matches no application
    let (status, body) = send(create_test_app(), read_request("abnormal", Some("1"), "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no data"));

    let (status, body) = send(create_test_app(), read_request("referrer", Some("1"), "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["referrerDtoList"], json!([]));
}
