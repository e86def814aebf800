use axum::{
    extract::{Json, State},
    response::Json as ResponseJson,
    Extension,
};
use serde_json::{json, Value};
use crate::auth::Claims;
use crate::models::user::{CreateUserRequest, LoginRequest, UserResponse};
use crate::{AppError, AppState, Result};

pub async fn register(
    State(app_state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<ResponseJson<Value>> {
    let (user, token) = app_state.user_service.create_user(request, &app_state.auth_service).await?;

    Ok(ResponseJson(json!({
        "user": user,
        "token": token,
        "message": "Registration successful"
    })))
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<ResponseJson<Value>> {
    authenticate(app_state, request, false).await
}

/// Same as `login`, restricted to accounts with the admin role
pub async fn login_admin(
    State(app_state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<ResponseJson<Value>> {
    authenticate(app_state, request, true).await
}

async fn authenticate(app_state: AppState, request: LoginRequest, require_admin: bool) -> Result<ResponseJson<Value>> {
    let (user, token) = app_state.user_service.authenticate_user(
        &request.email,
        &request.password,
        require_admin,
        &app_state.auth_service,
    ).await?;

    Ok(ResponseJson(json!({
        "user": user,
        "token": token,
        "message": "Login successful"
    })))
}

pub async fn user_profile(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ResponseJson<UserResponse>> {
    let user = app_state.user_service
        .get_user(claims.user_uuid()?)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ResponseJson(user))
}
