pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_admin, require_session};
use crate::routes::{admin, chat, documents, health, search, upload, users};
use crate::state::AppState;

/// Assembles the full route table (spec.md §6), layering `require_session`
/// over every authenticated group and `require_admin` over the admin
/// group, the way `calimero-auth::api::routes::create_router` layers
/// `forward_auth_middleware` only over its protected group.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_layer = if state.config.cors.allow_all_origins {
        CorsLayer::permissive()
    } else {
        let mut layer = CorsLayer::new();
        for origin in &state.config.cors.allowed_origins {
            if let Ok(value) = origin.parse::<axum::http::HeaderValue>() {
                layer = layer.allow_origin(value);
            }
        }
        layer
    };

    let public_routes = Router::new()
        .route("/api/v1/users/register", post(users::register_handler))
        .route("/api/v1/users/login", post(users::login_handler))
        .route("/api/v1/auth/refreshToken", post(users::refresh_handler))
        .route("/api/v1/upload/supported-types", get(upload::supported_types_handler))
        .route("/healthz", get(health::health_handler));

    let authenticated_routes = Router::new()
        .route("/api/v1/users/logout", post(users::logout_handler))
        .route("/api/v1/users/logout-all", post(users::logout_all_handler))
        .route("/api/v1/upload/chunk", post(upload::chunk_upload_handler))
        .route("/api/v1/upload/status", get(upload::status_handler))
        .route("/api/v1/upload/merge", post(upload::merge_handler))
        .route("/api/v1/documents/:fingerprint", delete(documents::delete_handler))
        .route("/api/v1/documents/uploads", get(documents::list_uploads_handler))
        .route("/api/v1/documents/accessible", get(documents::list_accessible_handler))
        .route("/api/v1/documents/download", get(documents::download_handler))
        .route("/api/v1/search/hybrid", get(search::hybrid_search_handler))
        .layer(from_fn(require_session));

    let admin_routes = Router::new()
        .route("/api/v1/admin/tags", get(admin::list_tags_handler).post(admin::create_tag_handler))
        .route("/api/v1/admin/tags/:tag_id", delete(admin::delete_tag_handler))
        .route("/api/v1/admin/tags/:tag_id/parent", post(admin::update_tag_parent_handler))
        .route("/api/v1/admin/users", get(admin::list_users_handler))
        .route(
            "/api/v1/admin/users/:user_id/tags",
            post(admin::update_assigned_tags_handler),
        )
        .route("/api/v1/admin/users/:user_id/role", post(admin::update_role_handler))
        .layer(from_fn(require_admin))
        .layer(from_fn(require_session));

    let chat_route = Router::new().route("/ws/chat/:session_handle", get(chat::chat_socket_handler));

    public_routes
        .merge(authenticated_routes)
        .merge(admin_routes)
        .merge(chat_route)
        .layer(cors_layer)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
