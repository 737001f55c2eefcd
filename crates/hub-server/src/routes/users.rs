//! Registration, login, refresh and logout (spec.md §6
//! `/users/register`, `/users/login`, `/auth/refreshToken`, `/users/logout*`).

use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use hub_primitives::{private_tag_for, OrganizationTag, User};
use hub_repository::{TagRepository, UserRepository};
use serde::{Deserialize, Serialize};

use crate::auth::CallerContext;
use crate::error::HttpError;
use crate::response::{empty_ok, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub login: String,
    pub primary_tag: String,
}

fn validate_credentials(login: &str, secret: &str) -> Result<(), HttpError> {
    if login.trim().is_empty() || secret.is_empty() {
        return Err(HttpError::Validation("login and secret are required".into()));
    }
    Ok(())
}

pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    validate_credentials(&req.login, &req.secret)?;

    let primary_tag = private_tag_for(&req.login);
    let hashed = hub_auth::hash_secret(&req.secret);
    let user = UserRepository::insert(
        &*state.repo,
        User::new(0, req.login.clone(), hashed, primary_tag.clone()),
    )
    .await?;

    // The private tag's `created_by` is the user's own freshly-assigned id —
    // there is no separate system actor for self-registration.
    TagRepository::insert(
        &*state.repo,
        OrganizationTag::new(primary_tag.clone(), format!("{}'s private tag", req.login), user.id, None),
    )
    .await?;

    Ok(ApiResponse::created(RegisterResponse {
        user_id: user.id,
        login: user.login,
        primary_tag,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_handle: String,
    pub refresh_handle: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    validate_credentials(&req.login, &req.secret)?;

    let user = state
        .repo
        .find_by_login(&req.login)
        .await?
        .ok_or_else(|| HttpError::AuthN("invalid login or secret".into()))?;

    if !hub_auth::verify_secret(&req.secret, &user.hashed_secret) {
        return Err(HttpError::AuthN("invalid login or secret".into()));
    }

    let issued = state.sessions.issue(user.id).await?;
    Ok(ApiResponse::ok(SessionResponse {
        session_handle: issued.session_handle,
        refresh_handle: issued.refresh_handle,
        expires_at: issued.expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_handle: String,
}

pub async fn refresh_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let issued = state.sessions.refresh(&req.refresh_handle).await?;
    Ok(ApiResponse::ok(SessionResponse {
        session_handle: issued.session_handle,
        refresh_handle: issued.refresh_handle,
        expires_at: issued.expires_at,
    }))
}

pub async fn logout_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    state.sessions.logout(&caller.session_handle).await?;
    Ok(empty_ok())
}

pub async fn logout_all_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    state.sessions.logout_all(caller.user_id).await?;
    Ok(empty_ok())
}
