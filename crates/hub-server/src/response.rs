//! The uniform JSON envelope `{code, message, data}` (spec.md §6).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
        (
            StatusCode::OK,
            Json(ApiResponse {
                code: StatusCode::OK.as_u16(),
                message: "ok".into(),
                data: Some(data),
            }),
        )
    }

    pub fn created(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
        (
            StatusCode::CREATED,
            Json(ApiResponse {
                code: StatusCode::CREATED.as_u16(),
                message: "created".into(),
                data: Some(data),
            }),
        )
    }
}

/// A response carrying no payload, used for `Allow`/delete-style endpoints
/// and for every error path.
pub fn empty_ok() -> Response {
    ApiResponse::ok(()).into_response()
}
