// Authentication middleware for protecting routes
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use crate::{AppError, AppState};

/// Verifies the bearer token and makes its `Claims` available to handlers
/// through `Extension<Claims>`.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("No token provided".to_string()))?
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid authorization header format".to_string()))?;

    let claims = app_state.auth_service.verify_bearer(auth_header)?;
    tracing::debug!("🔐 AUTH: Request authenticated for user {}", claims.user_id);

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
