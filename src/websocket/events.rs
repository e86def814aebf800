//! Websocket frame types for live rooms
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NewQuestion, Question};

/// Admin triage actions on a single question
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriageAction {
    Answered,
    Remove,
}

/// Events sent by clients
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoomSocket {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    NewQuestion(NewQuestion),

    /// The id stays a string; votes for ids that do not parse are ignored
    #[serde(rename_all = "camelCase")]
    UpvoteQuestion {
        question_id: String,
        user_name: String,
        room_id: String,
    },

    #[serde(rename_all = "camelCase")]
    AdminAction {
        action: TriageAction,
        question_id: Uuid,
        room_id: String,
    },

    RemoveAll {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    CloseRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    Ping,
}

/// Events sent by the server, either to one connection or to a whole room
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected {
        authenticated: bool,
    },

    LoadQuestions(Vec<Question>),

    QuestionPosted(Question),

    QuestionUpdated(Question),

    QuestionAnswered(Uuid),

    QuestionRemoved(Uuid),

    AllQuestionsRemoved,

    RoomClosed {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    Error {
        message: String,
    },

    Pong,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Frame for a triage action on `question_id`
    pub fn triaged(action: TriageAction, question_id: Uuid) -> Self {
        match action {
            TriageAction::Answered => ServerEvent::QuestionAnswered(question_id),
            TriageAction::Remove => ServerEvent::QuestionRemoved(question_id),
        }
    }
}
