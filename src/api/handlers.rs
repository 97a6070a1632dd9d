//! HTTP request handlers

use super::types::HealthResponse;
use super::AppState;
use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "Upload bot is running"
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.runtime.active_sessions(),
        active_conversations: state.runtime.active_runtimes().await,
    })
}

async fn get_version() -> &'static str {
    concat!("upload-bot ", env!("CARGO_PKG_VERSION"))
}
