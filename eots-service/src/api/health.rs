//! Health Endpoint
//!
//! - `/health` – returns `200 OK` once the service is up.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};

/// Create a router containing the health endpoint.
pub(crate) fn routes() -> Router {
    Router::new().route("/health", get(health))
}

/// Responds with `200 OK` and a static body.
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
