//! Shared application state and router assembly.
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;

use crate::api::handlers;
use crate::provider::ImageEditProvider;
use crate::session::SessionState;

/// Request-body cap. Must clear the 9 MiB image limit after base64 expansion
/// (4/3) plus JSON framing; the handler enforces the decoded cap itself.
const MAX_BODY_BYTES: usize = 13 * 1024 * 1024;

pub struct AppState {
    pub session: RwLock<SessionState>,
    pub provider: Arc<dyn ImageEditProvider>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/image", post(handlers::upload_image))
        .route("/generate", post(handlers::generate))
        .route("/status", get(handlers::status))
        .route("/image/generated", get(handlers::download_generated))
        .route("/reset", post(handlers::reset))
        .route("/presets", get(handlers::presets))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
