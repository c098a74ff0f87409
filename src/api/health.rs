//! Banner and health check endpoints

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Body of `GET /`
pub const BANNER: &str = "Object Detection API";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Plain-text banner
async fn home() -> &'static str {
    BANNER
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the banner and health router
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
}
