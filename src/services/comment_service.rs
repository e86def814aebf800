use crate::db::repository::{CommentRepository, PostRepository};
use crate::models::comment::{CommentResponse, CreateCommentRequest};
use crate::models::{AuthorSummary, Comment, CommentThread, UpvoteOutcome};
use crate::services::UserService;
use crate::{AppError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_service: Arc<UserService>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_service: Arc<UserService>,
    ) -> Self {
        Self { comment_repo, post_repo, user_service }
    }

    pub async fn create_comment(&self, post_id: Uuid, request: CreateCommentRequest, author_id: Uuid) -> Result<CommentResponse> {
        self.insert(post_id, None, request, author_id).await
    }

    /// Replies attach to a comment of the same post. Threads are one level
    /// deep, so a reply to a reply joins the thread of its top-level comment.
    pub async fn reply_to_comment(
        &self,
        post_id: Uuid,
        parent_id: Uuid,
        request: CreateCommentRequest,
        author_id: Uuid,
    ) -> Result<CommentResponse> {
        let parent = self.comment_repo.get_comment_by_id(parent_id).await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        let thread_root = parent.parent_id.unwrap_or(parent.id);
        self.insert(post_id, Some(thread_root), request, author_id).await
    }

    async fn insert(
        &self,
        post_id: Uuid,
        parent_id: Option<Uuid>,
        request: CreateCommentRequest,
        author_id: Uuid,
    ) -> Result<CommentResponse> {
        let description = request.description.trim();
        if description.is_empty() {
            return Err(AppError::ValidationError("Comment description is required".to_string()));
        }

        if self.post_repo.get_post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            parent_id,
            user_id: author_id,
            description: description.to_string(),
            votes: 0,
            upvoted_by: Vec::new(),
            created_at: Utc::now(),
        };

        let created = self.comment_repo.create_comment(&comment).await?;
        tracing::info!("💬 COMMENT: {} on post {} (reply to {:?})", created.id, post_id, parent_id);

        let author = self.user_service.author_summaries(&[author_id]).await?.remove(&author_id);
        Ok(CommentResponse::new(created, author))
    }

    /// Top-level comments newest first, each with its replies
    pub async fn get_comment_threads(&self, post_id: Uuid) -> Result<Vec<CommentThread>> {
        let comments = self.comment_repo.get_comments_by_post_id(post_id).await?;
        let author_ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
        let authors = self.user_service.author_summaries(&author_ids).await?;
        Ok(build_threads(comments, &authors))
    }

    pub async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid, user_id: Uuid) -> Result<()> {
        let comment = self.comment_repo.get_comment_by_id(comment_id).await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != user_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        self.comment_repo.delete_comment(comment.id).await?;
        tracing::info!("🗑️ COMMENT: Deleted {} from post {}", comment.id, post_id);
        Ok(())
    }

    pub async fn upvote_comment(&self, post_id: Uuid, comment_id: Uuid, user_id: Uuid) -> Result<CommentResponse> {
        let belongs_to_post = self.comment_repo.get_comment_by_id(comment_id).await?
            .is_some_and(|c| c.post_id == post_id);
        if !belongs_to_post {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        match self.comment_repo.upvote_comment(comment_id, user_id).await? {
            UpvoteOutcome::Applied(comment) => {
                let author = self.user_service.author_summaries(&[comment.user_id]).await?.remove(&comment.user_id);
                Ok(CommentResponse::new(comment, author))
            }
            UpvoteOutcome::NotAllowed => Err(AppError::ValidationError("Already upvoted".to_string())),
            UpvoteOutcome::NotFound => Err(AppError::NotFound("Comment not found".to_string())),
        }
    }

    /// Removes every comment on a post; used when the post itself goes
    pub async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        self.comment_repo.delete_comments_for_post(post_id).await
    }
}

/// Groups a flat comment list into threads. Input order is kept for both
/// top-level comments and replies; replies whose parent is missing are dropped.
pub fn build_threads(comments: Vec<Comment>, authors: &HashMap<Uuid, AuthorSummary>) -> Vec<CommentThread> {
    let mut replies: HashMap<Uuid, Vec<CommentResponse>> = HashMap::new();
    let mut top_level = Vec::new();

    for comment in comments {
        let author = authors.get(&comment.user_id).cloned();
        match comment.parent_id {
            Some(parent_id) => replies
                .entry(parent_id)
                .or_default()
                .push(CommentResponse::new(comment, author)),
            None => top_level.push(CommentResponse::new(comment, author)),
        }
    }

    top_level
        .into_iter()
        .map(|comment| CommentThread {
            replies: replies.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect()
}
