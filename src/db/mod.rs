pub mod postgres;
pub mod repository;

// Database connection and state management
use std::sync::Arc;

use crate::config::{AppConfig, StorageMode};
use crate::utils::database_retry::with_database_retry;
use crate::Result;
use postgres::PostgresDatabase;
use repository::{
    CommentRepository, InMemoryCommentRepository, InMemoryPostRepository,
    InMemoryQuestionRepository, InMemoryRoomRepository, InMemoryUserRepository, PostRepository,
    QuestionRepository, RoomRepository, UserRepository,
};

#[derive(Clone)]
pub struct DatabaseClient {
    pub user_repo: Arc<dyn UserRepository>,
    pub room_repo: Arc<dyn RoomRepository>,
    pub question_repo: Arc<dyn QuestionRepository>,
    pub post_repo: Arc<dyn PostRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    postgres: Option<Arc<PostgresDatabase>>,
}

impl DatabaseClient {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        match &config.storage_mode {
            StorageMode::Memory => {
                tracing::warn!("⚠️ DATABASE: DATABASE_URL not set, using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageMode::Postgres { database_url } => {
                let database = with_database_retry(|| PostgresDatabase::new(database_url)).await?;
                database.ensure_schema().await?;
                Ok(Self::from_postgres(Arc::new(database)))
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            user_repo: Arc::new(InMemoryUserRepository::new()),
            room_repo: Arc::new(InMemoryRoomRepository::new()),
            question_repo: Arc::new(InMemoryQuestionRepository::new()),
            post_repo: Arc::new(InMemoryPostRepository::new()),
            comment_repo: Arc::new(InMemoryCommentRepository::new()),
            postgres: None,
        }
    }

    fn from_postgres(database: Arc<PostgresDatabase>) -> Self {
        Self {
            user_repo: Arc::new(database.user_repo()),
            room_repo: Arc::new(database.room_repo()),
            question_repo: Arc::new(database.question_repo()),
            post_repo: Arc::new(database.post_repo()),
            comment_repo: Arc::new(database.comment_repo()),
            postgres: Some(database),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        if self.postgres.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        match &self.postgres {
            Some(database) => database.ping().await,
            None => Ok(()),
        }
    }
}
