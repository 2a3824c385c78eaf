use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::analytics::{AnalyticsError, AnalyticsService};
use crate::storage::StoreError;

use super::dto::{
    AbnormalResDto, DataReqDto, ErrorResponse, ReferrerResDto, ResponseTimeResDto,
    SuccessResponse, UserCountResDto,
};

/// Header the gateway fills with the authenticated member id
pub const MEMBER_ID_HEADER: &str = "X-Member-Id";

pub struct AppState {
    pub analytics: AnalyticsService,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Member id and application token of a read request
fn read_params(headers: &HeaderMap, payload: DataReqDto) -> Result<(i64, String), ApiError> {
    let member_id = headers
        .get(MEMBER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("{MEMBER_ID_HEADER} header must carry a member id"),
            )
        })?;

    let token = payload.application_token.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "applicationToken is required")
    })?;

    Ok((member_id, token))
}

/// Keep "nothing recorded" apart from "could not ask the store"
fn analytics_error(operation: &str, e: AnalyticsError) -> ApiError {
    let status = match &e {
        AnalyticsError::NoData => StatusCode::NOT_FOUND,
        AnalyticsError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AnalyticsError::Store(StoreError::Query(_)) | AnalyticsError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
    };

    if e.is_no_data() {
        tracing::debug!("{} found no data", operation);
    } else {
        tracing::error!("Failed to compute {}: {}", operation, e);
    }

    error_response(status, e.to_string())
}

/// Average response time of an application
pub async fn response_time(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DataReqDto>,
) -> Result<Json<ResponseTimeResDto>, ApiError> {
    let (member_id, token) = read_params(&headers, payload)?;
    state
        .analytics
        .response_time(member_id, &token)
        .await
        .map(|r| Json(r.into()))
        .map_err(|e| analytics_error("response time", e))
}

/// Referrer distribution of an application
pub async fn referrer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DataReqDto>,
) -> Result<Json<ReferrerResDto>, ApiError> {
    let (member_id, token) = read_params(&headers, payload)?;
    state
        .analytics
        .referrer_distribution(member_id, &token)
        .await
        .map(|d| Json(d.into()))
        .map_err(|e| analytics_error("referrer distribution", e))
}

/// Current-page distribution of an application
pub async fn user_count(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DataReqDto>,
) -> Result<Json<UserCountResDto>, ApiError> {
    let (member_id, token) = read_params(&headers, payload)?;
    state
        .analytics
        .page_distribution(member_id, &token)
        .await
        .map(|d| Json(d.into()))
        .map_err(|e| analytics_error("page distribution", e))
}

/// Whether the latest session of an application was flagged abnormal
pub async fn abnormal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DataReqDto>,
) -> Result<Json<AbnormalResDto>, ApiError> {
    let (member_id, token) = read_params(&headers, payload)?;
    state
        .analytics
        .abnormal_flag(member_id, &token)
        .await
        .map(|f| Json(f.into()))
        .map_err(|e| analytics_error("abnormal flag", e))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
