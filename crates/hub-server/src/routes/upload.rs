//! Chunked upload endpoints (spec.md §6 `/upload/*`), fronting
//! [`hub_upload::UploadCoordinator`].

use std::sync::Arc;

use axum::extract::{Extension, Multipart, Query};
use hub_upload::{expected_chunk_count, SUPPORTED_EXTENSIONS};
use serde::{Deserialize, Serialize};

use crate::auth::CallerContext;
use crate::error::HttpError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default)]
struct ChunkForm {
    file_md5: Option<String>,
    file_name: Option<String>,
    chunk_index: Option<i64>,
    total_size: Option<u64>,
    scope_tag: Option<String>,
    is_public: bool,
    bytes: Option<Vec<u8>>,
}

pub async fn chunk_upload_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let mut form = ChunkForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fileMd5" => form.file_md5 = Some(text_field(field).await?),
            "fileName" => form.file_name = Some(text_field(field).await?),
            "chunkIndex" => {
                form.chunk_index = Some(
                    text_field(field)
                        .await?
                        .parse()
                        .map_err(|_| HttpError::Validation("chunkIndex must be an integer".into()))?,
                )
            }
            "totalSize" => {
                form.total_size = Some(
                    text_field(field)
                        .await?
                        .parse()
                        .map_err(|_| HttpError::Validation("totalSize must be an integer".into()))?,
                )
            }
            "scopeTag" => form.scope_tag = Some(text_field(field).await?),
            "isPublic" => form.is_public = text_field(field).await?.eq_ignore_ascii_case("true"),
            "file" => {
                form.bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| HttpError::Validation(format!("failed to read chunk bytes: {e}")))?
                        .to_vec(),
                )
            }
            _ => {}
        }
    }

    let fingerprint = form.file_md5.ok_or_else(|| HttpError::Validation("fileMd5 is required".into()))?;
    let filename = form.file_name.ok_or_else(|| HttpError::Validation("fileName is required".into()))?;
    let index = form.chunk_index.ok_or_else(|| HttpError::Validation("chunkIndex is required".into()))?;
    let total_size = form.total_size.ok_or_else(|| HttpError::Validation("totalSize is required".into()))?;
    let bytes = form.bytes.ok_or_else(|| HttpError::Validation("file part is required".into()))?;

    state
        .upload
        .upload_chunk(
            &fingerprint,
            index,
            total_size,
            &filename,
            &bytes,
            form.scope_tag,
            form.is_public,
            caller.user_id,
        )
        .await?;

    Ok(ApiResponse::ok(()))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, HttpError> {
    field
        .text()
        .await
        .map_err(|e| HttpError::Validation(format!("invalid multipart field: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub file_md5: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uploaded: Vec<i64>,
    pub total_chunks: u64,
    pub progress: f64,
}

pub async fn status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<StatusQuery>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let file = hub_repository::FileRepository::find(&*state.repo, &query.file_md5, caller.user_id)
        .await?
        .ok_or(HttpError::NotFound)?;

    let uploaded = state.upload.list_uploaded(&query.file_md5, caller.user_id).await?;
    let total_chunks = expected_chunk_count(file.total_size);
    let progress = if total_chunks == 0 {
        100.0
    } else {
        uploaded.len() as f64 / total_chunks as f64 * 100.0
    };

    Ok(ApiResponse::ok(StatusResponse {
        uploaded,
        total_chunks,
        progress,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub file_md5: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub url: String,
}

pub async fn merge_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    axum::Json(req): axum::Json<MergeRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let url = state.upload.merge(&req.file_md5, &req.file_name, caller.user_id).await?;
    Ok(ApiResponse::ok(MergeResponse { url }))
}

pub async fn supported_types_handler() -> impl axum::response::IntoResponse {
    ApiResponse::ok(SUPPORTED_EXTENSIONS)
}
