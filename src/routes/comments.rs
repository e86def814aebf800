/*!
 * Comment routes
 *
 * Comments hang off a post and may carry one level of replies. Listing
 * returns threads: each top-level comment with its replies.
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::Claims,
    models::comment::{CommentResponse, CreateCommentRequest},
    models::CommentThread,
    AppState, Result,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub message: String,
    pub new_reply: CommentResponse,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// GET /posts/{post_id}/comments
pub async fn get_post_comments(
    Path(post_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<CommentThread>>> {
    let threads = app_state.comment_service.get_comment_threads(post_id).await?;
    tracing::debug!("📝 Retrieved {} comment threads for post {}", threads.len(), post_id);
    Ok(Json(threads))
}

/// POST /posts/{post_id}/comments
pub async fn create_comment(
    Path(post_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let comment = app_state.comment_service
        .create_comment(post_id, request, claims.user_uuid()?)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /posts/{post_id}/comments/{comment_id}/reply
pub async fn reply_to_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ReplyResponse>)> {
    let reply = app_state.comment_service
        .reply_to_comment(post_id, comment_id, request, claims.user_uuid()?)
        .await?;

    Ok((StatusCode::CREATED, Json(ReplyResponse {
        message: "Reply added successfully".to_string(),
        new_reply: reply,
    })))
}

/// DELETE /posts/{post_id}/comments/{comment_id}
pub async fn delete_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SuccessResponse>> {
    app_state.comment_service
        .delete_comment(post_id, comment_id, claims.user_uuid()?)
        .await?;

    Ok(Json(SuccessResponse {
        message: "Comment deleted successfully".to_string(),
    }))
}

/// PUT /posts/{post_id}/comments/{comment_id}/upvote
pub async fn upvote_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CommentResponse>> {
    let comment = app_state.comment_service
        .upvote_comment(post_id, comment_id, claims.user_uuid()?)
        .await?;
    Ok(Json(comment))
}
