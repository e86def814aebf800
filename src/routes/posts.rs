use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;
use crate::auth::Claims;
use crate::models::post::{CreatePostRequest, PostResponse, Section};
use crate::{AppError, AppState, Result};

pub async fn create_post(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<PostResponse>)> {
    let post = app_state.post_service.create_post(request, claims.user_uuid()?).await?;
    Ok((StatusCode::CREATED, ResponseJson(post)))
}

/// `GET /posts/:section`. The path segment shares its name with the post id
/// routes, so it arrives as a plain string and is parsed here.
pub async fn get_section_posts(
    State(app_state): State<AppState>,
    Path(section): Path<String>,
) -> Result<ResponseJson<Vec<PostResponse>>> {
    let section: Section = section.parse().map_err(AppError::ValidationError)?;
    let posts = app_state.post_service.get_section_feed(section).await?;
    Ok(ResponseJson(posts))
}

pub async fn delete_post(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    app_state.post_service.delete_post(post_id, claims.user_uuid()?).await?;

    Ok(ResponseJson(json!({
        "message": "Post and its comments deleted successfully"
    })))
}

pub async fn upvote_post(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<PostResponse>> {
    let post = app_state.post_service.upvote_post(post_id, claims.user_uuid()?).await?;
    Ok(ResponseJson(post))
}
