use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::shortener::LinkService;

use super::handlers::{health_check, redirect_url, RedirectState};

pub fn create_redirect_router(service: Arc<LinkService>, redirect_status: RedirectMode) -> Router {
    let state = Arc::new(RedirectState {
        service,
        redirect_status,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
