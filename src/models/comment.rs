use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::AuthorSummary;

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>, // None for top-level comments
    pub user_id: Uuid,
    pub description: String,
    pub votes: i64,
    pub upvoted_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user: Option<AuthorSummary>,
    pub description: String,
    pub votes: i64,
    pub upvoted_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: Comment, user: Option<AuthorSummary>) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            user,
            description: comment.description,
            votes: comment.votes,
            upvoted_by: comment.upvoted_by,
            created_at: comment.created_at,
        }
    }
}

/// A top-level comment with its direct replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}
