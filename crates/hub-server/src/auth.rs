//! Bearer-token authentication middleware, grounded on
//! `calimero-auth::auth::middleware::forward_auth_middleware` — validate
//! the handle, stash the caller on the request, let the handler read it
//! back out via `Extension<CallerContext>`.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Extension, Request};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hub_primitives::{Role, User};
use hub_repository::UserRepository;
use tracing::debug;

use crate::error::HttpError;
use crate::state::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_session`] and read back out by handlers.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: i64,
    pub is_admin: bool,
    pub assigned_tags: Vec<String>,
    pub effective_tags: HashSet<String>,
    /// The bearer handle that authenticated this request, needed by
    /// `/users/logout` to blacklist exactly this handle.
    pub session_handle: String,
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Validates the session handle, loads the caller's user record and
/// effective tag set, and inserts a [`CallerContext`] into the request.
pub async fn require_session(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, HttpError> {
    let token = bearer_token(&request)
        .ok_or_else(|| HttpError::AuthN("missing bearer token".into()))?
        .to_string();

    let subject = state.sessions.validate(&token).await?;

    let user: User = state
        .repo
        .find_by_id(subject)
        .await?
        .ok_or_else(|| HttpError::AuthN("session subject no longer exists".into()))?;

    let effective_tags = state.tag_resolver.effective_tags(&user).await;
    debug!(user_id = subject, tags = effective_tags.len(), "session validated");

    request.extensions_mut().insert(CallerContext {
        user_id: user.id,
        is_admin: user.role == Role::Admin,
        assigned_tags: user.assigned_tags.clone(),
        effective_tags,
        session_handle: token,
    });

    Ok(next.run(request).await)
}

/// Guards `/api/v1/admin/**`: the caller must already be authenticated
/// (this layer runs after [`require_session`]) and hold the ADMIN role.
pub async fn require_admin(
    Extension(caller): Extension<CallerContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, HttpError> {
    if !caller.is_admin {
        return Err(HttpError::AuthZ("admin role required".into()));
    }
    Ok(next.run(request).await)
}
