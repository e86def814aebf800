pub mod user;
pub mod room;
pub mod question;
pub mod post;
pub mod comment;

// Re-export models for convenience
pub use user::{AuthorSummary, User, UserRole};
pub use room::Room;
pub use question::{NewQuestion, Question};
pub use post::{Post, Section};
pub use comment::{Comment, CommentThread};

/// Result of a conditional vote increment
#[derive(Debug, Clone, PartialEq)]
pub enum UpvoteOutcome<T> {
    /// The counter was incremented; carries the updated record
    Applied(T),
    /// The voter already voted (or, for questions, asked it)
    NotAllowed,
    NotFound,
}
