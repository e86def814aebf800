use crate::auth::AuthService;
use crate::db::repository::{QuestionRepository, RoomRepository};
use crate::models::Room;
use crate::websocket::broadcaster::RoomBroadcaster;
use crate::websocket::events::ServerEvent;
use crate::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct RoomService {
    room_repo: Arc<dyn RoomRepository>,
    question_repo: Arc<dyn QuestionRepository>,
    auth_service: Arc<AuthService>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl RoomService {
    pub fn new(
        room_repo: Arc<dyn RoomRepository>,
        question_repo: Arc<dyn QuestionRepository>,
        auth_service: Arc<AuthService>,
        broadcaster: Arc<RoomBroadcaster>,
    ) -> Self {
        Self { room_repo, question_repo, auth_service, broadcaster }
    }

    pub async fn create_room(&self, admin_id: Uuid, password: &str) -> Result<Room> {
        if password.trim().is_empty() {
            return Err(AppError::ValidationError("Room password is required".to_string()));
        }

        let room = Room {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4().to_string(),
            password_hash: self.auth_service.hash_password(password)?,
            admin_id,
            created_at: Utc::now(),
        };

        let room = self.room_repo.create_room(&room).await?;
        tracing::info!("🏠 ROOM: Created {} by admin {}", room.room_id, admin_id);
        Ok(room)
    }

    /// Verifies the room password; the room must still exist
    pub async fn join_room(&self, room_id: &str, password: &str) -> Result<Room> {
        let room = self.get_room(room_id).await?;

        if !self.auth_service.verify_password(password, &room.password_hash)? {
            return Err(AppError::Forbidden("Invalid room credentials".to_string()));
        }

        Ok(room)
    }

    pub async fn get_room(&self, room_id: &str) -> Result<Room> {
        self.room_repo
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".to_string()))
    }

    pub async fn room_exists(&self, room_id: &str) -> Result<bool> {
        Ok(self.room_repo.get_room(room_id).await?.is_some())
    }

    /// The room, provided `user_id` administers it
    pub async fn require_admin(&self, room_id: &str, user_id: Uuid) -> Result<Room> {
        let room = self.get_room(room_id).await?;
        if !room.is_admin(user_id) {
            return Err(AppError::Forbidden("You are not the admin of this room".to_string()));
        }
        Ok(room)
    }

    /// Tells the room it is closing, then deletes it with its questions
    pub async fn close_room(&self, room_id: &str, user_id: Uuid) -> Result<()> {
        let room = self.require_admin(room_id, user_id).await?;

        let notified = self.broadcaster.close_room(
            &room.room_id,
            ServerEvent::RoomClosed { room_id: room.room_id.clone() },
        );

        let removed = self.question_repo.delete_questions_in_room(&room.room_id).await?;
        self.room_repo.delete_room(&room.room_id).await?;

        tracing::info!("🚪 ROOM: Closed {} ({} questions removed, {} connections notified)",
                       room.room_id, removed, notified);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{InMemoryQuestionRepository, InMemoryRoomRepository};
    use crate::models::Question;

    struct Fixture {
        service: RoomService,
        questions: Arc<InMemoryQuestionRepository>,
        broadcaster: Arc<RoomBroadcaster>,
    }

    fn fixture() -> Fixture {
        let questions = Arc::new(InMemoryQuestionRepository::new());
        let broadcaster = Arc::new(RoomBroadcaster::new(16));
        let service = RoomService::new(
            Arc::new(InMemoryRoomRepository::new()),
            questions.clone(),
            Arc::new(AuthService::new("test-secret".to_string(), 3600)),
            broadcaster.clone(),
        );
        Fixture { service, questions, broadcaster }
    }

    #[tokio::test]
    async fn test_join_checks_password() {
        let f = fixture();
        let admin = Uuid::new_v4();
        let room = f.service.create_room(admin, "secret").await.unwrap();
        assert!(Uuid::parse_str(&room.room_id).is_ok());

        assert!(f.service.join_room(&room.room_id, "secret").await.is_ok());
        assert!(matches!(f.service.join_room(&room.room_id, "guess").await, Err(AppError::Forbidden(_))));
        assert!(matches!(f.service.join_room("missing", "secret").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_only_admin_can_close() {
        let f = fixture();
        let admin = Uuid::new_v4();
        let room = f.service.create_room(admin, "secret").await.unwrap();

        let err = f.service.close_room(&room.room_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(f.service.room_exists(&room.room_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_notifies_and_cascades() {
        let f = fixture();
        let admin = Uuid::new_v4();
        let room = f.service.create_room(admin, "secret").await.unwrap();
        f.questions
            .create_question(&Question::new(room.room_id.clone(), "q".into(), "u".into()))
            .await
            .unwrap();
        let mut rx = f.broadcaster.subscribe(&room.room_id);

        f.service.close_room(&room.room_id, admin).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), ServerEvent::RoomClosed { room_id: room.room_id.clone() });
        assert!(!f.service.room_exists(&room.room_id).await.unwrap());
        assert!(f.questions.list_questions(&room.room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_password_is_rejected() {
        let f = fixture();
        assert!(matches!(f.service.create_room(Uuid::new_v4(), " ").await, Err(AppError::ValidationError(_))));
    }
}
