use crate::db::repository::PostRepository;
use crate::models::post::{CreatePostRequest, PostResponse};
use crate::models::{Post, Section, UpvoteOutcome};
use crate::services::{CommentService, UserService};
use crate::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    comment_service: Arc<CommentService>,
    user_service: Arc<UserService>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        comment_service: Arc<CommentService>,
        user_service: Arc<UserService>,
    ) -> Self {
        Self { post_repo, comment_service, user_service }
    }

    pub async fn create_post(&self, request: CreatePostRequest, author_id: Uuid) -> Result<PostResponse> {
        let title = request.title.trim();
        let content = request.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::ValidationError("Title and content are required".to_string()));
        }
        let section: Section = request.section.parse().map_err(AppError::ValidationError)?;

        let post = Post {
            id: Uuid::new_v4(),
            user_id: author_id,
            title: title.to_string(),
            content: content.to_string(),
            section,
            votes: 0,
            upvoted_by: Vec::new(),
            created_at: Utc::now(),
        };

        let created = self.post_repo.create_post(&post).await?;
        tracing::info!("📝 POST: {} created in {} by {}", created.id, created.section, author_id);

        let author = self.user_service.author_summaries(&[author_id]).await?.remove(&author_id);
        Ok(PostResponse::new(created, author, Vec::new()))
    }

    /// All posts of a section, best first, each with its comment threads
    pub async fn get_section_feed(&self, section: Section) -> Result<Vec<PostResponse>> {
        let posts = self.post_repo.get_posts_by_section(section).await?;

        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        let authors = self.user_service.author_summaries(&author_ids).await?;

        let mut feed = Vec::with_capacity(posts.len());
        for post in posts {
            let threads = self.comment_service.get_comment_threads(post.id).await?;
            let author = authors.get(&post.user_id).cloned();
            feed.push(PostResponse::new(post, author, threads));
        }

        tracing::debug!("📰 POST: Served {} posts for {}", feed.len(), section);
        Ok(feed)
    }

    /// Deletes a post and all of its comments; only the author may do this
    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let post = self.post_repo.get_post_by_id(post_id).await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.user_id != user_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        let removed = self.comment_service.delete_comments_for_post(post.id).await?;
        self.post_repo.delete_post(post.id).await?;
        tracing::info!("🗑️ POST: Deleted {} with {} comments", post.id, removed);
        Ok(())
    }

    pub async fn upvote_post(&self, post_id: Uuid, user_id: Uuid) -> Result<PostResponse> {
        match self.post_repo.upvote_post(post_id, user_id).await? {
            UpvoteOutcome::Applied(post) => {
                let author = self.user_service.author_summaries(&[post.user_id]).await?.remove(&post.user_id);
                let threads = self.comment_service.get_comment_threads(post.id).await?;
                Ok(PostResponse::new(post, author, threads))
            }
            UpvoteOutcome::NotAllowed => Err(AppError::ValidationError("Already upvoted".to_string())),
            UpvoteOutcome::NotFound => Err(AppError::NotFound("Post not found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthService;
    use crate::db::repository::{InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository};
    use crate::models::comment::CreateCommentRequest;
    use crate::models::user::CreateUserRequest;

    struct Fixture {
        posts: PostService,
        comments: Arc<CommentService>,
        users: Arc<UserService>,
    }

    fn fixture() -> Fixture {
        let post_repo = Arc::new(InMemoryPostRepository::new());
        let users = Arc::new(UserService::new(Arc::new(InMemoryUserRepository::new())));
        let comments = Arc::new(CommentService::new(
            Arc::new(InMemoryCommentRepository::new()),
            post_repo.clone(),
            users.clone(),
        ));
        let posts = PostService::new(post_repo, comments.clone(), users.clone());
        Fixture { posts, comments, users }
    }

    fn request(title: &str, section: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            content: "body".to_string(),
            section: section.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_attaches_author() {
        let f = fixture();
        let auth = AuthService::new("test-secret".to_string(), 3600);
        let (user, _) = f.users
            .create_user(
                CreateUserRequest {
                    email: "a@example.com".to_string(),
                    password: "pw".to_string(),
                    username: "ana".to_string(),
                    role: None,
                },
                &auth,
            )
            .await
            .unwrap();

        let post = f.posts.create_post(request("Hello", "Web3"), user.id).await.unwrap();
        assert_eq!(post.section, Section::Web3);
        assert_eq!(post.user.map(|u| u.username), Some("ana".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_section_is_rejected() {
        let f = fixture();
        let err = f.posts.create_post(request("Hello", "cooking"), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_feed_is_ordered_by_votes() {
        let f = fixture();
        let author = Uuid::new_v4();
        let quiet = f.posts.create_post(request("quiet", "dev"), author).await.unwrap();
        let popular = f.posts.create_post(request("popular", "dev"), author).await.unwrap();
        f.posts.create_post(request("elsewhere", "devops"), author).await.unwrap();
        f.posts.upvote_post(popular.id, Uuid::new_v4()).await.unwrap();

        let feed = f.posts.get_section_feed(Section::Dev).await.unwrap();
        let ids: Vec<Uuid> = feed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![popular.id, quiet.id]);
    }

    #[tokio::test]
    async fn test_double_upvote_is_rejected() {
        let f = fixture();
        let post = f.posts.create_post(request("p", "dev"), Uuid::new_v4()).await.unwrap();
        let voter = Uuid::new_v4();

        assert_eq!(f.posts.upvote_post(post.id, voter).await.unwrap().votes, 1);
        match f.posts.upvote_post(post.id, voter).await {
            Err(AppError::ValidationError(msg)) => assert_eq!(msg, "Already upvoted"),
            other => panic!("expected rejection, got {:?}", other.map(|p| p.votes)),
        }
    }

    #[tokio::test]
    async fn test_delete_is_owner_only_and_cascades() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let post = f.posts.create_post(request("p", "dev"), owner).await.unwrap();
        f.comments
            .create_comment(post.id, CreateCommentRequest { description: "c".to_string() }, Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(f.posts.delete_post(post.id, Uuid::new_v4()).await, Err(AppError::Forbidden(_))));

        f.posts.delete_post(post.id, owner).await.unwrap();
        assert!(f.comments.get_comment_threads(post.id).await.unwrap().is_empty());
        assert!(matches!(f.posts.delete_post(post.id, owner).await, Err(AppError::NotFound(_))));
    }
}
