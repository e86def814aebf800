use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use crate::AppState;

pub async fn root() -> &'static str {
    "Inquiso API is running"
}

/// Liveness plus a storage round trip
pub async fn health(State(app_state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = app_state.db.backend_name();

    match app_state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "inquiso",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": backend,
                "liveRooms": app_state.broadcaster.active_rooms()
            })),
        ),
        Err(e) => {
            tracing::error!("❌ HEALTH: {} storage check failed: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "inquiso",
                    "storage": backend
                })),
            )
        }
    }
}
