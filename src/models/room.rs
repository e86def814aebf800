use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// A live Q&A session. `room_id` is the public code audiences join with.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: Uuid,
    pub room_id: String,
    pub password_hash: String,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.admin_id == user_id
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: String,
    pub password: String,
}
