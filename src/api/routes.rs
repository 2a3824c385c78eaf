use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::analytics::AnalyticsService;

use super::handlers::{abnormal, health_check, referrer, response_time, user_count, AppState};

pub fn create_api_router(analytics: AnalyticsService) -> Router {
    let state = Arc::new(AppState { analytics });

    let data_routes = Router::new()
        .route("/response-time", post(response_time))
        .route("/referrer", post(referrer))
        .route("/user-count", post(user_count))
        .route("/abnormal", post(abnormal))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/data", data_routes)
        .layer(CorsLayer::permissive())
}
