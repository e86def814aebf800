// Repository trait abstractions for database operations
use crate::models::{Comment, Post, Question, Room, Section, UpvoteOutcome, User};
use crate::models::{post::sort_for_feed, question::sort_for_display};
use crate::{AppError, Result};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, room: &Room) -> Result<Room>;
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>>;
    /// Returns false when no such room existed
    async fn delete_room(&self, room_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn create_question(&self, question: &Question) -> Result<Question>;
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>>;
    /// Room questions, most votes first then newest first
    async fn list_questions(&self, room_id: &str) -> Result<Vec<Question>>;
    async fn upvote_question(&self, id: Uuid, user_name: &str) -> Result<UpvoteOutcome<Question>>;
    async fn delete_question(&self, id: Uuid) -> Result<bool>;
    async fn delete_questions_in_room(&self, room_id: &str) -> Result<u64>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post>;
    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    /// Section posts, most votes first then newest first
    async fn get_posts_by_section(&self, section: Section) -> Result<Vec<Post>>;
    async fn delete_post(&self, id: Uuid) -> Result<bool>;
    async fn upvote_post(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Post>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment>;
    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Every comment and reply of a post, newest first
    async fn get_comments_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    /// Deletes the comment together with its replies
    async fn delete_comment(&self, id: Uuid) -> Result<bool>;
    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64>;
    async fn upvote_comment(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Comment>>;
}

// In-memory implementations for development and tests
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::InternalError("In-memory store lock poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>, // id -> User
}

#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: Arc<Mutex<HashMap<String, Room>>>, // room_id -> Room
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: Arc<Mutex<HashMap<Uuid, Question>>>,
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: Arc<Mutex<HashMap<Uuid, Post>>>,
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: Arc<Mutex<HashMap<Uuid, Comment>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut users = lock(&self.users)?;

        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = lock(&self.users)?;
        Ok(users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = lock(&self.users)?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create_room(&self, room: &Room) -> Result<Room> {
        let mut rooms = lock(&self.rooms)?;

        if rooms.contains_key(&room.room_id) {
            return Err(AppError::Conflict("Room already exists".to_string()));
        }

        rooms.insert(room.room_id.clone(), room.clone());
        Ok(room.clone())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        Ok(lock(&self.rooms)?.get(room_id).cloned())
    }

    async fn delete_room(&self, room_id: &str) -> Result<bool> {
        Ok(lock(&self.rooms)?.remove(room_id).is_some())
    }
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn create_question(&self, question: &Question) -> Result<Question> {
        lock(&self.questions)?.insert(question.id, question.clone());
        Ok(question.clone())
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        Ok(lock(&self.questions)?.get(&id).cloned())
    }

    async fn list_questions(&self, room_id: &str) -> Result<Vec<Question>> {
        let mut list: Vec<Question> = lock(&self.questions)?
            .values()
            .filter(|q| q.room_id == room_id)
            .cloned()
            .collect();
        sort_for_display(&mut list);
        Ok(list)
    }

    async fn upvote_question(&self, id: Uuid, user_name: &str) -> Result<UpvoteOutcome<Question>> {
        let mut questions = lock(&self.questions)?;

        let Some(question) = questions.get_mut(&id) else {
            return Ok(UpvoteOutcome::NotFound);
        };
        if !question.can_be_upvoted_by(user_name) {
            return Ok(UpvoteOutcome::NotAllowed);
        }

        question.votes += 1;
        question.upvoted_by.push(user_name.to_string());
        Ok(UpvoteOutcome::Applied(question.clone()))
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        Ok(lock(&self.questions)?.remove(&id).is_some())
    }

    async fn delete_questions_in_room(&self, room_id: &str) -> Result<u64> {
        let mut questions = lock(&self.questions)?;
        let before = questions.len();
        questions.retain(|_, q| q.room_id != room_id);
        Ok((before - questions.len()) as u64)
    }
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        lock(&self.posts)?.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(lock(&self.posts)?.get(&id).cloned())
    }

    async fn get_posts_by_section(&self, section: Section) -> Result<Vec<Post>> {
        let mut list: Vec<Post> = lock(&self.posts)?
            .values()
            .filter(|p| p.section == section)
            .cloned()
            .collect();
        sort_for_feed(&mut list);
        Ok(list)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        Ok(lock(&self.posts)?.remove(&id).is_some())
    }

    async fn upvote_post(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Post>> {
        let mut posts = lock(&self.posts)?;

        let Some(post) = posts.get_mut(&id) else {
            return Ok(UpvoteOutcome::NotFound);
        };
        if post.upvoted_by.contains(&user_id) {
            return Ok(UpvoteOutcome::NotAllowed);
        }

        post.votes += 1;
        post.upvoted_by.push(user_id);
        Ok(UpvoteOutcome::Applied(post.clone()))
    }
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        lock(&self.comments)?.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(lock(&self.comments)?.get(&id).cloned())
    }

    async fn get_comments_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut list: Vec<Comment> = lock(&self.comments)?
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let mut comments = lock(&self.comments)?;
        if comments.remove(&id).is_none() {
            return Ok(false);
        }

        // Walk down every level of replies
        let mut orphaned = vec![id];
        while let Some(parent) = orphaned.pop() {
            let children: Vec<Uuid> = comments
                .values()
                .filter(|c| c.parent_id == Some(parent))
                .map(|c| c.id)
                .collect();
            for child in children {
                comments.remove(&child);
                orphaned.push(child);
            }
        }
        Ok(true)
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        let mut comments = lock(&self.comments)?;
        let before = comments.len();
        comments.retain(|_, c| c.post_id != post_id);
        Ok((before - comments.len()) as u64)
    }

    async fn upvote_comment(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Comment>> {
        let mut comments = lock(&self.comments)?;

        let Some(comment) = comments.get_mut(&id) else {
            return Ok(UpvoteOutcome::NotFound);
        };
        if comment.upvoted_by.contains(&user_id) {
            return Ok(UpvoteOutcome::NotAllowed);
        }

        comment.votes += 1;
        comment.upvoted_by.push(user_id);
        Ok(UpvoteOutcome::Applied(comment.clone()))
    }
}
