use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub room_id: String,
    pub text: String,
    pub user_name: String,
    pub votes: i64,
    pub upvoted_by: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn new(room_id: String, text: String, user_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            text,
            user_name,
            votes: 0,
            upvoted_by: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Askers cannot upvote their own question, and nobody votes twice
    pub fn can_be_upvoted_by(&self, user_name: &str) -> bool {
        self.user_name != user_name && !self.upvoted_by.iter().any(|u| u == user_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub text: String,
    pub user_name: String,
    pub room_id: String,
}

/// Most votes first, newest first among equals
pub fn sort_for_display(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
