use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::shortener::{LinkService, ShortenerError};

pub struct RedirectState {
    pub service: Arc<LinkService>,
    pub redirect_status: RedirectMode,
}

/// Redirect to original URL
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
) -> Response {
    match state.service.resolve(&code).await {
        Ok(resolution) => match HeaderValue::from_str(&resolution.original_url) {
            Ok(location) => (
                state.redirect_status.status_code(),
                [(header::LOCATION, location)],
            )
                .into_response(),
            // The visit was already counted by `resolve`
            Err(err) => {
                tracing::error!(short_code = %code, error = %err, "stored URL is not a valid Location header, click still counted");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        },
        Err(ShortenerError::NotFound) => {
            (StatusCode::NOT_FOUND, "Short link not found").into_response()
        }
        Err(ShortenerError::StoreUnavailable(message)) => {
            tracing::error!(short_code = %code, error = %message, "lookup failed, store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
