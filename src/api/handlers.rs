use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{CreateLinkRequest, CreateLinkResponse, Link, ListQuery};
use crate::shortener::{LinkService, ShortenerError};

pub struct AppState {
    pub service: Arc<LinkService>,
    pub redirect_base_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_count: Option<i64>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: ShortenerError) -> ApiError {
    let status = match &err {
        ShortenerError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        ShortenerError::Conflict(_) => StatusCode::CONFLICT,
        ShortenerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ShortenerError::NotFound => StatusCode::NOT_FOUND,
        ShortenerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, kind = err.kind(), "request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.kind().to_string(),
            details: err.to_string(),
        }),
    )
}

fn invalid_request(details: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_request".to_string(),
            details: details.into(),
        }),
    )
}

/// Create a new short link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateLinkResponse>), ApiError> {
    let Json(payload) = payload.map_err(|e| invalid_request(e.body_text()))?;
    let original_url = payload
        .original_url
        .ok_or_else(|| invalid_request("originalUrl is required"))?;

    let link = state
        .service
        .create_link(&original_url)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateLinkResponse {
            short_url: format!("{}/{}", state.redirect_base_url, link.short_code),
            short_code: link.short_code,
            original_url: link.original_url,
        }),
    ))
}

/// List links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Link>>, ApiError> {
    state
        .service
        .list_links(query.limit, query.offset)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Delete a link by id
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .service
        .delete_link(id)
        .await
        .map_err(error_response)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Health check endpoint, reports database connectivity
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.service.link_count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "connected".to_string(),
                link_count: Some(count),
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error".to_string(),
                    database: "unavailable".to_string(),
                    link_count: None,
                }),
            )
        }
    }
}
