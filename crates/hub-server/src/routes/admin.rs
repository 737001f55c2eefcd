//! Admin-only tag and user management (spec.md §6 `/admin/tags/*`,
//! `/admin/users/*`).
//!
//! spec.md's distilled admin surface also lists an "activities" resource,
//! but no `Activity` entity exists anywhere in `hub_primitives`'s data
//! model — there is nothing to list, create, or delete. That resource is
//! scoped out here rather than backed by a fabricated type; see DESIGN.md.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use hub_primitives::{OrganizationTag, Role, User};
use hub_repository::{TagRepository, UserRepository};
use serde::{Deserialize, Serialize};

use crate::error::HttpError;
use crate::response::{empty_ok, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub created_by: i64,
}

impl From<OrganizationTag> for TagView {
    fn from(t: OrganizationTag) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            parent_id: t.parent_id,
            created_by: t.created_by,
        }
    }
}

pub async fn list_tags_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let tags = TagRepository::list_all(&*state.repo).await?;
    Ok(ApiResponse::ok(tags.into_iter().map(TagView::from).collect::<Vec<_>>()))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

pub async fn create_tag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(caller): Extension<crate::auth::CallerContext>,
    Json(req): Json<CreateTagRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    if req.id.trim().is_empty() || req.name.trim().is_empty() {
        return Err(HttpError::Validation("id and name are required".into()));
    }
    if let Some(parent) = &req.parent_id {
        TagRepository::find(&*state.repo, parent)
            .await?
            .ok_or_else(|| HttpError::Validation(format!("unknown parent tag '{parent}'")))?;
    }

    let tag = TagRepository::insert(
        &*state.repo,
        OrganizationTag::new(req.id, req.name, caller.user_id, req.parent_id),
    )
    .await?;
    state.tag_resolver.invalidate_all();

    Ok(ApiResponse::created(TagView::from(tag)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateParentRequest {
    pub parent_id: Option<String>,
}

/// Walks from `candidate_parent` up through `parent_id` links looking for
/// `tag_id`. Byte-exact comparison, per the tag forest's stated invariant
/// (spec.md §9).
async fn would_form_cycle(repo: &impl TagRepository, tag_id: &str, candidate_parent: &str) -> Result<bool, HttpError> {
    let mut cursor = candidate_parent.to_string();
    let mut hops = 0usize;
    loop {
        if cursor == tag_id {
            return Ok(true);
        }
        hops += 1;
        if hops > 256 {
            return Ok(true); // corrupt forest; refuse rather than loop forever
        }
        match repo.find(&cursor).await? {
            Some(tag) => match tag.parent_id {
                Some(parent) => cursor = parent,
                None => return Ok(false),
            },
            None => return Ok(false),
        }
    }
}

pub async fn update_tag_parent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tag_id): Path<String>,
    Json(req): Json<UpdateParentRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    TagRepository::find(&*state.repo, &tag_id)
        .await?
        .ok_or(HttpError::NotFound)?;

    if let Some(parent) = &req.parent_id {
        if parent == &tag_id {
            return Err(HttpError::Validation("a tag cannot be its own parent".into()));
        }
        TagRepository::find(&*state.repo, parent)
            .await?
            .ok_or_else(|| HttpError::Validation(format!("unknown parent tag '{parent}'")))?;
        if would_form_cycle(&*state.repo, &tag_id, parent).await? {
            return Err(HttpError::Validation("that parent would form a cycle".into()));
        }
    }

    state.repo.update_parent(&tag_id, req.parent_id).await?;
    state.tag_resolver.invalidate_all();
    Ok(empty_ok())
}

pub async fn delete_tag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tag_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    TagRepository::find(&*state.repo, &tag_id)
        .await?
        .ok_or(HttpError::NotFound)?;
    if !TagRepository::list_children(&*state.repo, &tag_id).await?.is_empty() {
        return Err(HttpError::Conflict("tag has children".into()));
    }
    if state.repo.any_user_references_tag(&tag_id).await? {
        return Err(HttpError::Conflict("tag is assigned to at least one user".into()));
    }

    TagRepository::delete(&*state.repo, &tag_id).await?;
    state.tag_resolver.invalidate_all();
    Ok(empty_ok())
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub login: String,
    pub role: Role,
    pub assigned_tags: Vec<String>,
    pub primary_tag: Option<String>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            login: u.login,
            role: u.role,
            assigned_tags: u.assigned_tags,
            primary_tag: u.primary_tag,
        }
    }
}

pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    let users = UserRepository::list_all(&*state.repo).await?;
    Ok(ApiResponse::ok(users.into_iter().map(UserView::from).collect::<Vec<_>>()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignedTagsRequest {
    pub assigned_tags: Vec<String>,
    pub primary_tag: Option<String>,
}

pub async fn update_assigned_tags_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateAssignedTagsRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    UserRepository::find_by_id(&*state.repo, user_id)
        .await?
        .ok_or(HttpError::NotFound)?;

    for tag_id in &req.assigned_tags {
        TagRepository::find(&*state.repo, tag_id)
            .await?
            .ok_or_else(|| HttpError::Validation(format!("unknown tag '{tag_id}'")))?;
    }

    state
        .repo
        .update_assigned_tags(user_id, req.assigned_tags, req.primary_tag)
        .await?;
    state.tag_resolver.invalidate_user(user_id);
    Ok(empty_ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

pub async fn update_role_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl axum::response::IntoResponse, HttpError> {
    UserRepository::find_by_id(&*state.repo, user_id)
        .await?
        .ok_or(HttpError::NotFound)?;
    state.repo.update_role(user_id, req.role).await?;
    Ok(empty_ok())
}
