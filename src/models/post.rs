use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::comment::CommentThread;
use crate::models::user::AuthorSummary;

/// Forum board a post belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Web3,
    Dev,
    DevOps,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Web3 => "web3",
            Section::Dev => "dev",
            Section::DevOps => "devops",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web3" => Ok(Section::Web3),
            "dev" => Ok(Section::Dev),
            "devops" => Ok(Section::DevOps),
            other => Err(format!("Unknown section '{}'. Expected web3, dev or devops", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub section: Section,
    pub votes: i64,
    pub upvoted_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub section: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub user: Option<AuthorSummary>, // None once the author is gone
    pub title: String,
    pub content: String,
    pub section: Section,
    pub votes: i64,
    pub upvoted_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<CommentThread>,
}

impl PostResponse {
    pub fn new(post: Post, user: Option<AuthorSummary>, comments: Vec<CommentThread>) -> Self {
        Self {
            id: post.id,
            user,
            title: post.title,
            content: post.content,
            section: post.section,
            votes: post.votes,
            upvoted_by: post.upvoted_by,
            created_at: post.created_at,
            comments,
        }
    }
}

/// Highest voted first, newest first among equals
pub fn sort_for_feed(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
