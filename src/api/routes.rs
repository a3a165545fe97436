use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::shortener::LinkService;

use super::handlers::{create_link, delete_link, health_check, list_links, AppState};

pub fn create_api_router(service: Arc<LinkService>, redirect_base_url: &str) -> Router {
    let state = Arc::new(AppState {
        service,
        redirect_base_url: redirect_base_url.trim_end_matches('/').to_string(),
    });

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/links", get(list_links).post(create_link))
        .route("/api/links/{id}", delete(delete_link))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
