//! Comment and share-count endpoints

use crate::auth::models::{MessageResponse, TokenClaims};
use crate::content::store::{Comment, ContentStore, ShareCount};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    pub page_num: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: Option<String>,
    pub page_num: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub platform: Option<String>,
    pub article_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    pub count: i64,
}

/// GET /api/comments?pageNum=N
pub async fn list_comments(
    State(store): State<Arc<ContentStore>>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<Vec<Comment>>, ContentApiError> {
    let page_num = query
        .page_num
        .ok_or(ContentApiError::BadRequest("pageNum query is required"))?;

    let comments = store.comments_for_page(page_num).map_err(internal)?;
    Ok(Json(comments))
}

/// POST /api/comments (behind auth middleware)
pub async fn post_comment(
    State(store): State<Arc<ContentStore>>,
    Extension(claims): Extension<TokenClaims>,
    Json(payload): Json<NewComment>,
) -> Result<Json<MessageResponse>, ContentApiError> {
    let content = payload.content.as_deref().filter(|c| !c.is_empty());
    let (Some(content), Some(page_num)) = (content, payload.page_num) else {
        return Err(ContentApiError::BadRequest(
            "Content and page number are required.",
        ));
    };

    // Author comes from the verified token, never from the body
    let author = &claims.identity.email;
    store
        .add_comment(author, content, page_num)
        .map_err(internal)?;

    info!(page_num, author = %author, "Comment added");
    Ok(Json(MessageResponse::new("Comment added successfully!")))
}

/// POST /api/share
pub async fn record_share(
    State(store): State<Arc<ContentStore>>,
    Json(payload): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, ContentApiError> {
    let platform = payload.platform.as_deref().filter(|p| !p.is_empty());
    let article_id = payload.article_id.as_deref().filter(|a| !a.is_empty());
    let (Some(platform), Some(article_id)) = (platform, article_id) else {
        return Err(ContentApiError::BadRequest(
            "Platform and articleId required",
        ));
    };

    let count = store
        .increment_share(article_id, platform)
        .map_err(internal)?;

    Ok(Json(ShareResponse { count }))
}

/// GET /api/share/:article_id
pub async fn get_share_counts(
    State(store): State<Arc<ContentStore>>,
    Path(article_id): Path<String>,
) -> Result<Json<Vec<ShareCount>>, ContentApiError> {
    let counts = store.share_counts(&article_id).map_err(internal)?;
    Ok(Json(counts))
}

fn internal(err: anyhow::Error) -> ContentApiError {
    error!("Content store error: {:#}", err);
    ContentApiError::InternalError
}

#[derive(Debug)]
pub enum ContentApiError {
    BadRequest(&'static str),
    InternalError,
}

impl IntoResponse for ContentApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ContentApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ContentApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
