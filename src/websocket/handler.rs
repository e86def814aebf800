//! Websocket connection lifecycle
//!
//! Each upgraded connection runs one task that multiplexes two sources:
//! frames from the client and events from the room it has joined.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use crate::{AppError, AppState, Result};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// `GET /ws`. Anonymous connections may join, ask and vote; admin events
/// require a valid `?token=`. A token that is present but invalid is refused
/// before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(app_state): State<AppState>,
) -> Result<Response> {
    let user_id = match params.token.as_deref() {
        Some(token) => Some(app_state.auth_service.verify_token(token)?.user_uuid()?),
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| run_connection(socket, app_state, user_id)))
}

async fn run_connection(mut socket: WebSocket, app_state: AppState, user_id: Option<Uuid>) {
    let mut session = WsSession::new(app_state, user_id);
    tracing::info!("🔌 WS: Connection opened (authenticated: {})", user_id.is_some());

    if send_event(&mut socket, &ServerEvent::Connected { authenticated: user_id.is_some() }).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("🔌 WS: Receive failed: {}", e);
                        break;
                    }
                };

                let replies = session.handle_text(&text).await;
                if send_all(&mut socket, &replies).await.is_err() {
                    break;
                }
            }
            room_event = session.next_room_event() => {
                let replies = session.on_room_event(room_event).await;
                if send_all(&mut socket, &replies).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("🔌 WS: Connection closed (room: {:?})", session.current_room());
}

async fn send_all(socket: &mut WebSocket, events: &[ServerEvent]) -> std::result::Result<(), axum::Error> {
    for event in events {
        send_event(socket, event).await?;
    }
    Ok(())
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> std::result::Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!("❌ WS: Failed to serialize event: {}", e);
            Ok(())
        }
    }
}

/// Per-connection state. Holds the caller's verified identity and at most
/// one room subscription.
pub struct WsSession {
    app_state: AppState,
    user_id: Option<Uuid>,
    room: Option<(String, broadcast::Receiver<ServerEvent>)>,
}

impl WsSession {
    pub fn new(app_state: AppState, user_id: Option<Uuid>) -> Self {
        Self { app_state, user_id, room: None }
    }

    pub fn current_room(&self) -> Option<&str> {
        self.room.as_ref().map(|(room_id, _)| room_id.as_str())
    }

    /// Parses a text frame and handles it. The returned events go to this
    /// connection only.
    pub async fn handle_text(&mut self, text: &str) -> Vec<ServerEvent> {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                tracing::debug!("🔌 WS: Rejected frame: {}", e);
                vec![ServerEvent::error(format!("Invalid event: {}", e))]
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) -> Vec<ServerEvent> {
        match self.dispatch(event).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::debug!("🔌 WS: Event failed: {}", e);
                vec![ServerEvent::error(e.client_message())]
            }
        }
    }

    async fn dispatch(&mut self, event: ClientEvent) -> Result<Vec<ServerEvent>> {
        let questions = &self.app_state.question_service;

        match event {
            ClientEvent::JoinRoomSocket { room_id } => {
                if !self.app_state.room_service.room_exists(&room_id).await? {
                    return Err(AppError::NotFound("Room not found or has been deleted".to_string()));
                }
                self.leave_room();
                // Subscribe before reading the snapshot so nothing falls in between
                let rx = self.app_state.broadcaster.subscribe(&room_id);
                self.room = Some((room_id.clone(), rx));
                let snapshot = self.app_state.question_service.list_questions(&room_id).await?;
                tracing::debug!("🔌 WS: Joined room {}", room_id);
                Ok(vec![ServerEvent::LoadQuestions(snapshot)])
            }

            ClientEvent::NewQuestion(request) => {
                questions.ask(request).await?;
                Ok(Vec::new())
            }

            ClientEvent::UpvoteQuestion { question_id, user_name, room_id } => {
                questions.upvote(&question_id, &user_name, &room_id).await?;
                Ok(Vec::new())
            }

            ClientEvent::AdminAction { action, question_id, room_id } => {
                let admin_id = self.admin_identity(&room_id).await?;
                questions.triage(&room_id, question_id, action, admin_id).await?;
                Ok(Vec::new())
            }

            ClientEvent::RemoveAll { room_id } => {
                let admin_id = self.admin_identity(&room_id).await?;
                questions.remove_all(&room_id, admin_id).await?;
                Ok(Vec::new())
            }

            ClientEvent::CloseRoom { room_id } => {
                let admin_id = self.admin_identity(&room_id).await?;
                self.app_state.room_service.close_room(&room_id, admin_id).await?;
                if self.current_room() == Some(room_id.as_str()) {
                    self.leave_room();
                }
                Ok(vec![ServerEvent::RoomClosed { room_id }])
            }

            ClientEvent::Ping => Ok(vec![ServerEvent::Pong]),
        }
    }

    /// Drops the current subscription, if any
    fn leave_room(&mut self) {
        if let Some((room_id, rx)) = self.room.take() {
            self.app_state.broadcaster.unsubscribe(&room_id, rx);
        }
    }

    /// The verified caller id; anonymous connections fail the same way a
    /// wrong admin does, once the room is known to exist
    async fn admin_identity(&self, room_id: &str) -> Result<Uuid> {
        let room = self.app_state.room_service.get_room(room_id).await?;
        match self.user_id {
            Some(user_id) if room.is_admin(user_id) => Ok(user_id),
            _ => Err(AppError::Forbidden("You are not the admin of this room".to_string())),
        }
    }

    /// Waits for the next event of the joined room; never resolves while
    /// the connection is not in a room
    pub async fn next_room_event(&mut self) -> std::result::Result<ServerEvent, RecvError> {
        match self.room.as_mut() {
            Some((_, rx)) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Turns a room channel result into frames for this connection
    pub async fn on_room_event(&mut self, received: std::result::Result<ServerEvent, RecvError>) -> Vec<ServerEvent> {
        match received {
            Ok(event) => vec![event],
            Err(RecvError::Lagged(skipped)) => {
                let Some(room_id) = self.current_room().map(str::to_string) else {
                    return Vec::new();
                };
                tracing::warn!("⚠️ WS: Connection lagged {} events behind in room {}", skipped, room_id);

                let mut replies = vec![ServerEvent::error("Missed updates, reloading questions")];
                match self.app_state.question_service.list_questions(&room_id).await {
                    Ok(snapshot) => replies.push(ServerEvent::LoadQuestions(snapshot)),
                    Err(e) => tracing::error!("❌ WS: Snapshot after lag failed: {}", e),
                }
                replies
            }
            Err(RecvError::Closed) => {
                // The room was closed; its final event has already been delivered
                self.leave_room();
                Vec::new()
            }
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.leave_room();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::DatabaseClient;
    use crate::models::NewQuestion;
    use crate::websocket::events::TriageAction;

    fn state() -> AppState {
        AppState::with_database(AppConfig::for_memory("test-secret"), DatabaseClient::in_memory())
    }

    fn question(room_id: &str, text: &str) -> ClientEvent {
        ClientEvent::NewQuestion(NewQuestion {
            text: text.to_string(),
            user_name: "alice".to_string(),
            room_id: room_id.to_string(),
        })
    }

    #[tokio::test]
    async fn test_join_unknown_room_reports_error() {
        let mut session = WsSession::new(state(), None);
        let replies = session.handle_event(ClientEvent::JoinRoomSocket { room_id: "nope".into() }).await;
        assert_eq!(replies, vec![ServerEvent::error("Room not found or has been deleted")]);
        assert!(session.current_room().is_none());
    }

    #[tokio::test]
    async fn test_join_then_receive_room_events() {
        let state = state();
        let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state.clone(), None);

        let replies = session.handle_event(ClientEvent::JoinRoomSocket { room_id: room.room_id.clone() }).await;
        assert_eq!(replies, vec![ServerEvent::LoadQuestions(vec![])]);

        assert!(session.handle_event(question(&room.room_id, "Why?")).await.is_empty());

        match session.next_room_event().await {
            Ok(ServerEvent::QuestionPosted(q)) => assert_eq!(q.text, "Why?"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(session.next_room_event().await, Ok(ServerEvent::LoadQuestions(list)) if list.len() == 1));
    }

    #[tokio::test]
    async fn test_joining_another_room_replaces_subscription() {
        let state = state();
        let room_a = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let room_b = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state.clone(), None);

        session.handle_event(ClientEvent::JoinRoomSocket { room_id: room_a.room_id.clone() }).await;
        session.handle_event(ClientEvent::JoinRoomSocket { room_id: room_b.room_id.clone() }).await;
        assert_eq!(session.current_room(), Some(room_b.room_id.as_str()));
        assert_eq!(state.broadcaster.subscriber_count(&room_a.room_id), 0);

        session.handle_event(question(&room_a.room_id, "Anyone here?")).await;

        let pending = tokio::time::timeout(std::time::Duration::from_millis(100), session.next_room_event()).await;
        assert!(pending.is_err(), "event from the previous room arrived: {:?}", pending);
    }

    #[tokio::test]
    async fn test_dropped_session_releases_room_channel() {
        let state = state();
        let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state.clone(), None);
        session.handle_event(ClientEvent::JoinRoomSocket { room_id: room.room_id.clone() }).await;
        assert_eq!(state.broadcaster.active_rooms(), 1);

        drop(session);
        assert_eq!(state.broadcaster.active_rooms(), 0);
    }

    #[tokio::test]
    async fn test_upvote_with_malformed_id_is_ignored() {
        let state = state();
        let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state, None);

        let frame = format!(
            r#"{{"event":"upvote-question","data":{{"questionId":"not-a-uuid","userName":"bob","roomId":"{}"}}}}"#,
            room.room_id
        );
        assert!(session.handle_text(&frame).await.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_admin_action_is_refused() {
        let state = state();
        let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state, None);

        let replies = session
            .handle_event(ClientEvent::AdminAction {
                action: TriageAction::Remove,
                question_id: Uuid::new_v4(),
                room_id: room.room_id.clone(),
            })
            .await;
        assert_eq!(replies, vec![ServerEvent::error("You are not the admin of this room")]);

        let replies = session.handle_event(ClientEvent::RemoveAll { room_id: "missing".into() }).await;
        assert_eq!(replies, vec![ServerEvent::error("Room not found")]);
    }

    #[tokio::test]
    async fn test_admin_closes_room_and_leaves_it() {
        let state = state();
        let admin = Uuid::new_v4();
        let room = state.room_service.create_room(admin, "pw").await.unwrap();
        let mut session = WsSession::new(state.clone(), Some(admin));
        session.handle_event(ClientEvent::JoinRoomSocket { room_id: room.room_id.clone() }).await;

        let replies = session.handle_event(ClientEvent::CloseRoom { room_id: room.room_id.clone() }).await;
        assert_eq!(replies, vec![ServerEvent::RoomClosed { room_id: room.room_id.clone() }]);
        assert!(session.current_room().is_none());
        assert!(!state.room_service.room_exists(&room.room_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_lag_triggers_snapshot() {
        let state = state();
        let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();
        let mut session = WsSession::new(state, None);
        session.handle_event(ClientEvent::JoinRoomSocket { room_id: room.room_id.clone() }).await;

        let replies = session.on_room_event(Err(RecvError::Lagged(3))).await;
        assert_eq!(replies.len(), 2);
        assert!(matches!(replies[0], ServerEvent::Error { .. }));
        assert_eq!(replies[1], ServerEvent::LoadQuestions(vec![]));

        assert!(session.on_room_event(Err(RecvError::Closed)).await.is_empty());
        assert!(session.current_room().is_none());
    }

    #[tokio::test]
    async fn test_malformed_frame_and_ping() {
        let mut session = WsSession::new(state(), None);
        assert!(matches!(session.handle_text("not json").await.as_slice(), [ServerEvent::Error { .. }]));
        assert_eq!(session.handle_text(r#"{"event":"ping","data":null}"#).await, vec![ServerEvent::Pong]);
    }
}
