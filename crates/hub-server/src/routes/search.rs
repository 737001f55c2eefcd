//! Hybrid search endpoint (spec.md §6 `/search/hybrid`).

use std::sync::Arc;

use axum::extract::{Extension, Query};
use serde::{Deserialize, Serialize};

use crate::auth::CallerContext;
use crate::error::HttpError;
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchHitView {
    pub fingerprint: String,
    pub filename: String,
    pub chunk_id: i64,
    pub text: String,
    pub score: f32,
}

pub async fn hybrid_search_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<SearchQuery>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    if query.query.trim().is_empty() {
        return Err(HttpError::Validation("query must not be empty".into()));
    }
    let effective_tags: Vec<String> = caller.effective_tags.iter().cloned().collect();
    let top_k = query.top_k.unwrap_or(DEFAULT_TOP_K).max(1);

    let hits = state
        .search
        .search_with_permission(&query.query, caller.user_id, &effective_tags, top_k)
        .await?;

    let views: Vec<SearchHitView> = hits
        .into_iter()
        .map(|h| SearchHitView {
            fingerprint: h.fingerprint,
            filename: h.filename,
            chunk_id: h.chunk_id,
            text: h.text,
            score: h.score,
        })
        .collect();

    Ok(ApiResponse::ok(views))
}
