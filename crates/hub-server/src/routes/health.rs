//! Liveness probe, unauthenticated.

use crate::response::ApiResponse;

pub async fn health_handler() -> impl axum::response::IntoResponse {
    ApiResponse::ok("ok")
}
