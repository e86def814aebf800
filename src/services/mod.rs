pub mod user_service;
pub mod room_service;
pub mod question_service;
pub mod post_service;
pub mod comment_service;

// Re-export services for convenience
pub use user_service::UserService;
pub use room_service::RoomService;
pub use question_service::QuestionService;
pub use post_service::PostService;
pub use comment_service::CommentService;
