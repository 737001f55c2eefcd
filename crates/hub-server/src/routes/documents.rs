//! Document lifecycle endpoints (spec.md §6 `/documents/*`): cascade
//! delete, owner/accessible listings, and pre-signed download.
//!
//! `delete` and `download` both resolve a resource id to `(owner, scopeTag,
//! isPublic)` and run it through [`hub_auth::AuthorizationGuard`] — spec.md
//! §8 scenario 4 requires a cross-user delete attempt to fail with 403, so
//! both are treated as resource-scoped reads rather than the write-path
//! pass-through that §4.7 step 1 lists delete-by-fingerprint under.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use chrono::{DateTime, Duration, Utc};
use hub_auth::{AccessDecision, AuthorizationGuard};
use hub_objectstore::{merged_path, ObjectStore};
use hub_primitives::FileRecord;
use hub_repository::{ChunkRepository, FileRepository, PassageRepository};
use hub_search::SearchIndex;
use serde::{Deserialize, Serialize};

use crate::auth::CallerContext;
use crate::error::HttpError;
use crate::response::{empty_ok, ApiResponse};
use crate::state::AppState;

const DOWNLOAD_PRESIGN_TTL: Duration = Duration::minutes(15);

fn check_access(caller: &CallerContext, owner: i64, scope_tag: &str, is_public: bool) -> Result<(), HttpError> {
    match AuthorizationGuard::decide(caller.user_id, caller.is_admin, &caller.assigned_tags, owner, scope_tag, is_public) {
        AccessDecision::Allow => Ok(()),
        AccessDecision::NotFound => Err(HttpError::NotFound),
        AccessDecision::Deny(reason) => Err(HttpError::AuthZ(reason)),
    }
}

pub async fn delete_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Path(fingerprint): Path<String>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let (owner, scope_tag, is_public) = state
        .repo
        .scope_of(&fingerprint)
        .await?
        .ok_or(HttpError::NotFound)?;
    check_access(&caller, owner, &scope_tag, is_public)?;

    FileRepository::delete(&*state.repo, &fingerprint, owner).await?;
    ChunkRepository::delete_by_fingerprint(&*state.repo, &fingerprint).await?;
    PassageRepository::delete_by_fingerprint(&*state.repo, &fingerprint).await?;
    state.index.delete_by_fingerprint(&fingerprint).await?;

    Ok(empty_ok())
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub fingerprint: String,
    pub filename: String,
    pub total_size: u64,
    pub scope_tag: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for DocumentSummary {
    fn from(r: FileRecord) -> Self {
        Self {
            fingerprint: r.fingerprint,
            filename: r.filename,
            total_size: r.total_size,
            scope_tag: r.scope_tag,
            is_public: r.is_public,
            created_at: r.created_at,
            merged_at: r.merged_at,
        }
    }
}

pub async fn list_uploads_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let files = state.repo.list_by_owner(caller.user_id).await?;
    let summaries: Vec<DocumentSummary> = files.into_iter().map(DocumentSummary::from).collect();
    Ok(ApiResponse::ok(summaries))
}

pub async fn list_accessible_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let effective_tags: Vec<String> = caller.effective_tags.iter().cloned().collect();
    let files = state.repo.list_accessible(caller.user_id, &effective_tags).await?;
    let summaries: Vec<DocumentSummary> = files.into_iter().map(DocumentSummary::from).collect();
    Ok(ApiResponse::ok(summaries))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

pub async fn download_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let file = state
        .repo
        .find_by_filename(&query.file_name)
        .await?
        .ok_or(HttpError::NotFound)?;
    check_access(&caller, file.owner, &file.scope_tag, file.is_public)?;

    let url = state.objects.presign(&merged_path(&file.filename), DOWNLOAD_PRESIGN_TTL)?;
    Ok(ApiResponse::ok(DownloadResponse { url }))
}
