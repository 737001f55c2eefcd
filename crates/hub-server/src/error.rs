//! One `HttpError` enum centralizing the error taxonomy of spec.md §7,
//! the way `calimero-auth::AuthError` centralizes authentication errors
//! before they reach the axum error boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    AuthN(String),

    #[error("authorization failed: {0}")]
    AuthZ(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation(_) => StatusCode::BAD_REQUEST,
            HttpError::AuthN(_) => StatusCode::UNAUTHORIZED,
            HttpError::AuthZ(_) => StatusCode::FORBIDDEN,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::Conflict(_) => StatusCode::CONFLICT,
            HttpError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            HttpError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Infrastructure errors are logged with context here and never
        // reach the client as a raw stack trace (spec.md §7 propagation
        // policy); business errors carry their message straight through.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "upstream failure");
        }
        let body = ApiResponse::<()> {
            code: status.as_u16(),
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<hub_auth::AuthError> for HttpError {
    fn from(e: hub_auth::AuthError) -> Self {
        match e {
            hub_auth::AuthError::AuthenticationFailed(m) => HttpError::AuthN(m),
            hub_auth::AuthError::AuthorizationFailed(m) => HttpError::AuthZ(m),
            hub_auth::AuthError::NotFound => HttpError::NotFound,
            hub_auth::AuthError::Storage(m) => HttpError::Upstream(m),
        }
    }
}

impl From<hub_upload::UploadError> for HttpError {
    fn from(e: hub_upload::UploadError) -> Self {
        match e {
            hub_upload::UploadError::Validation(m) => HttpError::Validation(m),
            hub_upload::UploadError::UnsupportedType { extension, deny_listed } => {
                if deny_listed {
                    HttpError::Validation(format!("'.{extension}' files are not accepted"))
                } else {
                    HttpError::Validation(format!(
                        "'.{extension}' is not a recognized document type"
                    ))
                }
            }
            hub_upload::UploadError::NotFound => HttpError::NotFound,
            hub_upload::UploadError::Conflict(m) => HttpError::Conflict(m),
            hub_upload::UploadError::Storage(m) => HttpError::Upstream(m),
            hub_upload::UploadError::Repository(m) => HttpError::Upstream(m),
            hub_upload::UploadError::Queue(m) => HttpError::Upstream(m),
        }
    }
}

impl From<hub_repository::RepositoryError> for HttpError {
    fn from(e: hub_repository::RepositoryError) -> Self {
        match e {
            hub_repository::RepositoryError::NotFound => HttpError::NotFound,
            hub_repository::RepositoryError::Conflict(m) => HttpError::Conflict(m),
            hub_repository::RepositoryError::Backend(m) => HttpError::Upstream(m),
        }
    }
}

impl From<hub_objectstore::ObjectStoreError> for HttpError {
    fn from(e: hub_objectstore::ObjectStoreError) -> Self {
        HttpError::Upstream(e.to_string())
    }
}

impl From<hub_search::SearchError> for HttpError {
    fn from(e: hub_search::SearchError) -> Self {
        HttpError::Upstream(e.to_string())
    }
}

impl From<hub_kv::KvError> for HttpError {
    fn from(e: hub_kv::KvError) -> Self {
        HttpError::Upstream(e.to_string())
    }
}
