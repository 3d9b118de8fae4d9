//! Router assembly shared by the binary and the integration tests

use crate::{
    auth::{api as auth_api, auth_middleware, AuthState},
    content::{api as content_api, ContentStore},
    middleware::request_logging,
};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the full API router
pub fn router(auth_state: AuthState, content: Arc<ContentStore>) -> Router {
    let require_auth = middleware::from_fn_with_state(auth_state.tokens.clone(), auth_middleware);

    // Login / signup (public, auth state)
    let auth_router = Router::new()
        .route("/api/signup", post(auth_api::signup))
        .route("/api/login/user", post(auth_api::login_user))
        .route("/api/login/vendor", post(auth_api::login_vendor))
        .with_state(auth_state);

    // Routes that need a verified bearer token
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route_layer(require_auth.clone());

    // Reading comments is public, posting one is not
    let content_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/comments",
            get(content_api::list_comments)
                .merge(post(content_api::post_comment).route_layer(require_auth)),
        )
        .route("/api/share", post(content_api::record_share))
        .route("/api/share/:article_id", get(content_api::get_share_counts))
        .with_state(content);

    Router::new()
        .merge(content_routes)
        .merge(protected_routes)
        .merge(auth_router)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
