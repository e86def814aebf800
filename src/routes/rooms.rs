use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    Extension,
};
use serde_json::{json, Value};
use crate::auth::Claims;
use crate::models::room::{CreateRoomRequest, JoinRoomRequest};
use crate::{AppState, Result};

pub async fn create_room(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let room = app_state.room_service.create_room(claims.user_uuid()?, &request.password).await?;

    Ok((StatusCode::CREATED, ResponseJson(json!({
        "roomId": room.room_id,
        "message": "Room created successfully"
    }))))
}

pub async fn join_room(
    State(app_state): State<AppState>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<ResponseJson<Value>> {
    let room = app_state.room_service.join_room(&request.room_id, &request.password).await?;

    Ok(ResponseJson(json!({
        "roomId": room.room_id,
        "message": "Joined room successfully"
    })))
}

/// Closes the room for everyone connected to it
pub async fn delete_room(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<String>,
) -> Result<ResponseJson<Value>> {
    app_state.room_service.close_room(&room_id, claims.user_uuid()?).await?;

    Ok(ResponseJson(json!({
        "roomId": room_id,
        "message": "Room deleted successfully"
    })))
}
