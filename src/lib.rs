// Library modules for the Q&A and discussion service
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;
pub mod websocket;

// Re-export commonly used types
pub use config::{AppConfig, StorageMode};
pub use error::{AppError, Result};

use std::sync::Arc;
use websocket::broadcaster::RoomBroadcaster;

// Application state shared across handlers and websocket sessions
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DatabaseClient,
    pub auth_service: Arc<auth::AuthService>,
    pub user_service: Arc<services::UserService>,
    pub room_service: Arc<services::RoomService>,
    pub question_service: Arc<services::QuestionService>,
    pub post_service: Arc<services::PostService>,
    pub comment_service: Arc<services::CommentService>,
    pub broadcaster: Arc<RoomBroadcaster>,
}

impl AppState {
    /// Connects storage according to `config.storage_mode` and wires services
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = db::DatabaseClient::new(&config).await?;
        Ok(Self::with_database(config, db))
    }

    /// Wires every service on top of an already connected database client
    pub fn with_database(config: AppConfig, db: db::DatabaseClient) -> Self {
        let auth_service = Arc::new(auth::AuthService::new(
            config.jwt_secret.clone(),
            config.token_ttl_secs,
        ));
        let broadcaster = Arc::new(RoomBroadcaster::new(config.broadcast_capacity));

        let user_service = Arc::new(services::UserService::new(db.user_repo.clone()));
        let room_service = Arc::new(services::RoomService::new(
            db.room_repo.clone(),
            db.question_repo.clone(),
            auth_service.clone(),
            broadcaster.clone(),
        ));
        let question_service = Arc::new(services::QuestionService::new(
            db.question_repo.clone(),
            room_service.clone(),
            broadcaster.clone(),
        ));
        let comment_service = Arc::new(services::CommentService::new(
            db.comment_repo.clone(),
            db.post_repo.clone(),
            user_service.clone(),
        ));
        let post_service = Arc::new(services::PostService::new(
            db.post_repo.clone(),
            comment_service.clone(),
            user_service.clone(),
        ));

        Self {
            config,
            db,
            auth_service,
            user_service,
            room_service,
            question_service,
            post_service,
            comment_service,
            broadcaster,
        }
    }
}
