use crate::db::repository::QuestionRepository;
use crate::models::{NewQuestion, Question, UpvoteOutcome};
use crate::services::RoomService;
use crate::websocket::broadcaster::RoomBroadcaster;
use crate::websocket::events::{ServerEvent, TriageAction};
use crate::{AppError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Live room questions. Every mutation is followed by a broadcast to the
/// room: the specific event first, then a fresh ordered snapshot.
pub struct QuestionService {
    question_repo: Arc<dyn QuestionRepository>,
    room_service: Arc<RoomService>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl QuestionService {
    pub fn new(
        question_repo: Arc<dyn QuestionRepository>,
        room_service: Arc<RoomService>,
        broadcaster: Arc<RoomBroadcaster>,
    ) -> Self {
        Self { question_repo, room_service, broadcaster }
    }

    pub async fn list_questions(&self, room_id: &str) -> Result<Vec<Question>> {
        self.question_repo.list_questions(room_id).await
    }

    pub async fn ask(&self, request: NewQuestion) -> Result<Question> {
        let text = request.text.trim();
        let user_name = request.user_name.trim();
        if text.is_empty() || user_name.is_empty() {
            return Err(AppError::ValidationError("Question text and user name are required".to_string()));
        }
        if !self.room_service.room_exists(&request.room_id).await? {
            return Err(AppError::NotFound("Room not found or has been deleted".to_string()));
        }

        let question = Question::new(request.room_id.clone(), text.to_string(), user_name.to_string());
        let question = self.question_repo.create_question(&question).await?;
        tracing::info!("❓ QUESTION: {} asked in room {}", question.id, question.room_id);

        self.broadcaster.publish(&question.room_id, ServerEvent::QuestionPosted(question.clone()));
        self.publish_snapshot(&question.room_id).await?;
        Ok(question)
    }

    /// Returns the updated question, or `None` when the vote was ignored
    /// (malformed or unknown id, other room, own question, repeat vote).
    pub async fn upvote(&self, question_id: &str, user_name: &str, room_id: &str) -> Result<Option<Question>> {
        let Ok(question_id) = Uuid::parse_str(question_id) else {
            return Ok(None);
        };
        let Some(existing) = self.question_repo.get_question(question_id).await? else {
            return Ok(None);
        };
        if existing.room_id != room_id {
            return Ok(None);
        }

        match self.question_repo.upvote_question(question_id, user_name).await? {
            UpvoteOutcome::Applied(question) => {
                tracing::debug!("👍 QUESTION: {} upvoted by {} ({} votes)", question.id, user_name, question.votes);
                self.broadcaster.publish(room_id, ServerEvent::QuestionUpdated(question.clone()));
                self.publish_snapshot(room_id).await?;
                Ok(Some(question))
            }
            UpvoteOutcome::NotAllowed | UpvoteOutcome::NotFound => Ok(None),
        }
    }

    /// Marks a question answered or removes it; both take it off the board
    pub async fn triage(&self, room_id: &str, question_id: Uuid, action: TriageAction, admin_id: Uuid) -> Result<()> {
        self.room_service.require_admin(room_id, admin_id).await?;

        let question = self.question_repo.get_question(question_id).await?
            .filter(|q| q.room_id == room_id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        self.question_repo.delete_question(question.id).await?;
        tracing::info!("🗂️ QUESTION: {} {:?} by admin of room {}", question.id, action, room_id);

        self.broadcaster.publish(room_id, ServerEvent::triaged(action, question.id));
        Ok(())
    }

    pub async fn remove_all(&self, room_id: &str, admin_id: Uuid) -> Result<u64> {
        self.room_service.require_admin(room_id, admin_id).await?;

        let removed = self.question_repo.delete_questions_in_room(room_id).await?;
        tracing::info!("🧹 QUESTION: Removed all {} questions from room {}", removed, room_id);

        self.broadcaster.publish(room_id, ServerEvent::AllQuestionsRemoved);
        Ok(removed)
    }

    async fn publish_snapshot(&self, room_id: &str) -> Result<()> {
        let questions = self.question_repo.list_questions(room_id).await?;
        self.broadcaster.publish(room_id, ServerEvent::LoadQuestions(questions));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthService;
    use crate::db::repository::{InMemoryQuestionRepository, InMemoryRoomRepository};
    use tokio::sync::broadcast::Receiver;

    struct Fixture {
        questions: QuestionService,
        rooms: Arc<RoomService>,
        broadcaster: Arc<RoomBroadcaster>,
    }

    fn fixture() -> Fixture {
        let question_repo = Arc::new(InMemoryQuestionRepository::new());
        let broadcaster = Arc::new(RoomBroadcaster::new(32));
        let rooms = Arc::new(RoomService::new(
            Arc::new(InMemoryRoomRepository::new()),
            question_repo.clone(),
            Arc::new(AuthService::new("test-secret".to_string(), 3600)),
            broadcaster.clone(),
        ));
        let questions = QuestionService::new(question_repo, rooms.clone(), broadcaster.clone());
        Fixture { questions, rooms, broadcaster }
    }

    fn ask(room_id: &str, text: &str, user_name: &str) -> NewQuestion {
        NewQuestion {
            text: text.to_string(),
            user_name: user_name.to_string(),
            room_id: room_id.to_string(),
        }
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_ask_broadcasts_question_then_snapshot() {
        let f = fixture();
        let room = f.rooms.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut rx = f.broadcaster.subscribe(&room.room_id);

        let question = f.questions.ask(ask(&room.room_id, "What is ownership?", "alice")).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ServerEvent::QuestionPosted(question.clone()));
        assert_eq!(events[1], ServerEvent::LoadQuestions(vec![question]));
    }

    #[tokio::test]
    async fn test_ask_into_missing_room_fails() {
        let f = fixture();
        let err = f.questions.ask(ask("nowhere", "hello", "alice")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upvoting_twice_by_same_user_counts_once() {
        let f = fixture();
        let room = f.rooms.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let q = f.questions.ask(ask(&room.room_id, "Why?", "alice")).await.unwrap();
        let id = q.id.to_string();

        let first = f.questions.upvote(&id, "bob", &room.room_id).await.unwrap();
        let second = f.questions.upvote(&id, "bob", &room.room_id).await.unwrap();
        let own = f.questions.upvote(&id, "alice", &room.room_id).await.unwrap();

        assert_eq!(first.map(|q| q.votes), Some(1));
        assert!(second.is_none());
        assert!(own.is_none());
        assert_eq!(f.questions.list_questions(&room.room_id).await.unwrap()[0].votes, 1);
    }

    #[tokio::test]
    async fn test_upvote_is_scoped_to_room() {
        let f = fixture();
        let room = f.rooms.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let q = f.questions.ask(ask(&room.room_id, "Why?", "alice")).await.unwrap();

        assert!(f.questions.upvote(&q.id.to_string(), "bob", "other-room").await.unwrap().is_none());
        assert_eq!(f.questions.list_questions(&room.room_id).await.unwrap()[0].votes, 0);
    }

    #[tokio::test]
    async fn test_malformed_id_is_ignored() {
        let f = fixture();
        let room = f.rooms.create_room(Uuid::new_v4(), "pw").await.unwrap();
        assert!(f.questions.upvote("42", "bob", &room.room_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_triage_requires_admin() {
        let f = fixture();
        let admin = Uuid::new_v4();
        let room = f.rooms.create_room(admin, "pw").await.unwrap();
        let q = f.questions.ask(ask(&room.room_id, "Why?", "alice")).await.unwrap();
        let mut rx = f.broadcaster.subscribe(&room.room_id);

        let err = f.questions
            .triage(&room.room_id, q.id, TriageAction::Answered, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        f.questions.triage(&room.room_id, q.id, TriageAction::Answered, admin).await.unwrap();
        assert_eq!(drain(&mut rx), vec![ServerEvent::QuestionAnswered(q.id)]);
        assert!(f.questions.list_questions(&room.room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_only_touches_one_room() {
        let f = fixture();
        let admin = Uuid::new_v4();
        let room_a = f.rooms.create_room(admin, "pw").await.unwrap();
        let room_b = f.rooms.create_room(admin, "pw").await.unwrap();
        f.questions.ask(ask(&room_a.room_id, "a1", "u")).await.unwrap();
        f.questions.ask(ask(&room_a.room_id, "a2", "u")).await.unwrap();
        f.questions.ask(ask(&room_b.room_id, "b1", "u")).await.unwrap();

        assert_eq!(f.questions.remove_all(&room_a.room_id, admin).await.unwrap(), 2);
        assert!(f.questions.list_questions(&room_a.room_id).await.unwrap().is_empty());
        assert_eq!(f.questions.list_questions(&room_b.room_id).await.unwrap().len(), 1);
    }
}
