// PostgreSQL repository implementations using sqlx
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::repository::{
    CommentRepository, PostRepository, QuestionRepository, RoomRepository, UserRepository,
};
use crate::models::{Comment, Post, Question, Room, Section, UpvoteOutcome, User, UserRole};
use crate::{AppError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (LOWER(email));
CREATE TABLE IF NOT EXISTS rooms (
    id UUID PRIMARY KEY,
    room_id TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    admin_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS questions (
    id UUID PRIMARY KEY,
    room_id TEXT NOT NULL REFERENCES rooms(room_id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    user_name TEXT NOT NULL,
    votes BIGINT NOT NULL DEFAULT 0,
    upvoted_by TEXT[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS questions_room_idx ON questions (room_id, votes DESC, created_at DESC);
CREATE TABLE IF NOT EXISTS posts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    section TEXT NOT NULL,
    votes BIGINT NOT NULL DEFAULT 0,
    upvoted_by UUID[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS posts_section_idx ON posts (section, votes DESC, created_at DESC);
CREATE TABLE IF NOT EXISTS comments (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    parent_id UUID REFERENCES comments(id) ON DELETE CASCADE,
    user_id UUID NOT NULL,
    description TEXT NOT NULL,
    votes BIGINT NOT NULL DEFAULT 0,
    upvoted_by UUID[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS comments_post_idx ON comments (post_id, created_at DESC)
"#;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";
const ROOM_COLUMNS: &str = "id, room_id, password_hash, admin_id, created_at";
const QUESTION_COLUMNS: &str = "id, room_id, text, user_name, votes, upvoted_by, created_at";
const POST_COLUMNS: &str = "id, user_id, title, content, section, votes, upvoted_by, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, parent_id, user_id, description, votes, upvoted_by, created_at";

// PostgreSQL connection pool wrapper
pub struct PostgresDatabase {
    pub pool: Arc<PgPool>,
}

impl PostgresDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        tracing::info!("🔗 DATABASE: Configuring connection pool (max 20 connections, 30s acquire timeout)");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::error!("❌ DATABASE: Failed to create connection pool: {}", e);
                AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        tracing::info!("✅ DATABASE: Connection pool configured successfully");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Creates any missing tables and indexes
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
        }
        tracing::info!("✅ DATABASE: Schema is up to date");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }

    pub fn user_repo(&self) -> PostgresUserRepository {
        PostgresUserRepository { pool: self.pool.clone() }
    }

    pub fn room_repo(&self) -> PostgresRoomRepository {
        PostgresRoomRepository { pool: self.pool.clone() }
    }

    pub fn question_repo(&self) -> PostgresQuestionRepository {
        PostgresQuestionRepository { pool: self.pool.clone() }
    }

    pub fn post_repo(&self) -> PostgresPostRepository {
        PostgresPostRepository { pool: self.pool.clone() }
    }

    pub fn comment_repo(&self) -> PostgresCommentRepository {
        PostgresCommentRepository { pool: self.pool.clone() }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<UserRole>().map_err(AppError::DatabaseError)?,
        created_at: row.try_get("created_at")?,
    })
}

fn room_from_row(row: &PgRow) -> Result<Room> {
    Ok(Room {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        password_hash: row.try_get("password_hash")?,
        admin_id: row.try_get("admin_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn question_from_row(row: &PgRow) -> Result<Question> {
    Ok(Question {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        text: row.try_get("text")?,
        user_name: row.try_get("user_name")?,
        votes: row.try_get("votes")?,
        upvoted_by: row.try_get("upvoted_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    let section: String = row.try_get("section")?;
    Ok(Post {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        section: section.parse::<Section>().map_err(AppError::DatabaseError)?,
        votes: row.try_get("votes")?,
        upvoted_by: row.try_get("upvoted_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        parent_id: row.try_get("parent_id")?,
        user_id: row.try_get("user_id")?,
        description: row.try_get("description")?,
        votes: row.try_get("votes")?,
        upvoted_by: row.try_get("upvoted_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// PostgreSQL User Repository
pub struct PostgresUserRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Email is already registered".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create user: {}", e))
                }
            })?;

        user_from_row(&row)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get user by id: {}", e)))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get user by email: {}", e)))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get users: {}", e)))?;

        rows.iter().map(user_from_row).collect()
    }
}

// PostgreSQL Room Repository
pub struct PostgresRoomRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    async fn create_room(&self, room: &Room) -> Result<Room> {
        let sql = format!(
            "INSERT INTO rooms (id, room_id, password_hash, admin_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ROOM_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(room.id)
            .bind(&room.room_id)
            .bind(&room.password_hash)
            .bind(room.admin_id)
            .bind(room.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Room already exists".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create room: {}", e))
                }
            })?;

        room_from_row(&row)
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE room_id = $1", ROOM_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(room_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get room: {}", e)))?;

        row.as_ref().map(room_from_row).transpose()
    }

    async fn delete_room(&self, room_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete room: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

// PostgreSQL Question Repository
pub struct PostgresQuestionRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl QuestionRepository for PostgresQuestionRepository {
    async fn create_question(&self, question: &Question) -> Result<Question> {
        let sql = format!(
            "INSERT INTO questions (id, room_id, text, user_name, votes, upvoted_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            QUESTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(question.id)
            .bind(&question.room_id)
            .bind(&question.text)
            .bind(&question.user_name)
            .bind(question.votes)
            .bind(&question.upvoted_by)
            .bind(question.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create question: {}", e)))?;

        question_from_row(&row)
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get question: {}", e)))?;

        row.as_ref().map(question_from_row).transpose()
    }

    async fn list_questions(&self, room_id: &str) -> Result<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions WHERE room_id = $1 ORDER BY votes DESC, created_at DESC",
            QUESTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(room_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list questions: {}", e)))?;

        rows.iter().map(question_from_row).collect()
    }

    async fn upvote_question(&self, id: Uuid, user_name: &str) -> Result<UpvoteOutcome<Question>> {
        // Single statement so concurrent voters cannot double count
        let sql = format!(
            "UPDATE questions SET votes = votes + 1, upvoted_by = array_append(upvoted_by, $2) \
             WHERE id = $1 AND user_name <> $2 AND NOT ($2 = ANY(upvoted_by)) RETURNING {}",
            QUESTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upvote question: {}", e)))?;

        match row {
            Some(row) => Ok(UpvoteOutcome::Applied(question_from_row(&row)?)),
            None if self.get_question(id).await?.is_some() => Ok(UpvoteOutcome::NotAllowed),
            None => Ok(UpvoteOutcome::NotFound),
        }
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete question: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_questions_in_room(&self, room_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM questions WHERE room_id = $1")
            .bind(room_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clear questions: {}", e)))?;

        Ok(result.rows_affected())
    }
}

// PostgreSQL Post Repository
pub struct PostgresPostRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        let sql = format!(
            "INSERT INTO posts (id, user_id, title, content, section, votes, upvoted_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post.id)
            .bind(post.user_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.section.as_str())
            .bind(post.votes)
            .bind(&post.upvoted_by)
            .bind(post.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create post: {}", e)))?;

        post_from_row(&row)
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post: {}", e)))?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn get_posts_by_section(&self, section: Section) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE section = $1 ORDER BY votes DESC, created_at DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(section.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list posts: {}", e)))?;

        rows.iter().map(post_from_row).collect()
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete post: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn upvote_post(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Post>> {
        let sql = format!(
            "UPDATE posts SET votes = votes + 1, upvoted_by = array_append(upvoted_by, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(upvoted_by)) RETURNING {}",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upvote post: {}", e)))?;

        match row {
            Some(row) => Ok(UpvoteOutcome::Applied(post_from_row(&row)?)),
            None if self.get_post_by_id(id).await?.is_some() => Ok(UpvoteOutcome::NotAllowed),
            None => Ok(UpvoteOutcome::NotFound),
        }
    }
}

// PostgreSQL Comment Repository
pub struct PostgresCommentRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        let sql = format!(
            "INSERT INTO comments (id, post_id, parent_id, user_id, description, votes, upvoted_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            COMMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.parent_id)
            .bind(comment.user_id)
            .bind(&comment.description)
            .bind(comment.votes)
            .bind(&comment.upvoted_by)
            .bind(comment.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create comment: {}", e)))?;

        comment_from_row(&row)
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment: {}", e)))?;

        row.as_ref().map(comment_from_row).transpose()
    }

    async fn get_comments_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at DESC",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comments: {}", e)))?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        // Replies go with their parent through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete comment: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete comments: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn upvote_comment(&self, id: Uuid, user_id: Uuid) -> Result<UpvoteOutcome<Comment>> {
        let sql = format!(
            "UPDATE comments SET votes = votes + 1, upvoted_by = array_append(upvoted_by, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(upvoted_by)) RETURNING {}",
            COMMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upvote comment: {}", e)))?;

        match row {
            Some(row) => Ok(UpvoteOutcome::Applied(comment_from_row(&row)?)),
            None if self.get_comment_by_id(id).await?.is_some() => Ok(UpvoteOutcome::NotAllowed),
            None => Ok(UpvoteOutcome::NotFound),
        }
    }
}
