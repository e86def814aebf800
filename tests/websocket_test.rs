use futures::{SinkExt, StreamExt};
use inquiso::db::DatabaseClient;
use inquiso::routes::create_app;
use inquiso::{AppConfig, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::with_database(AppConfig::for_memory("ws-test-secret"), DatabaseClient::in_memory());
    let app = create_app(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, token: Option<&str>) -> Client {
    let url = match token {
        Some(token) => format!("ws://{}/ws?token={}", addr, token),
        None => format!("ws://{}/ws", addr),
    };
    let (mut client, _) = connect_async(url).await.unwrap();
    let hello = next_event(&mut client).await;
    assert_eq!(hello["event"], "connected");
    client
}

async fn emit(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn join(client: &mut Client, room_id: &str) -> Value {
    emit(client, "join-room-socket", json!({ "roomId": room_id })).await;
    let snapshot = next_event(client).await;
    assert_eq!(snapshot["event"], "load-questions");
    snapshot
}

#[tokio::test]
async fn test_questions_flow_to_everyone_in_the_room() {
    let (addr, state) = spawn_server().await;
    let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();

    let mut asker = connect(addr, None).await;
    let mut listener = connect(addr, None).await;
    join(&mut asker, &room.room_id).await;
    join(&mut listener, &room.room_id).await;

    emit(&mut asker, "new-question", json!({ "text": "Is async hard?", "userName": "alice", "roomId": room.room_id })).await;

    for client in [&mut asker, &mut listener] {
        let posted = next_event(client).await;
        assert_eq!(posted["event"], "question-posted");
        assert_eq!(posted["data"]["text"], "Is async hard?");
        let snapshot = next_event(client).await;
        assert_eq!(snapshot["event"], "load-questions");
        assert_eq!(snapshot["data"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_upvote_counts_once_per_user() {
    let (addr, state) = spawn_server().await;
    let room = state.room_service.create_room(Uuid::new_v4(), "pw").await.unwrap();

    let mut client = connect(addr, None).await;
    join(&mut client, &room.room_id).await;
    emit(&mut client, "new-question", json!({ "text": "Why?", "userName": "alice", "roomId": room.room_id })).await;
    let posted = next_event(&mut client).await;
    next_event(&mut client).await;
    let question_id = posted["data"]["id"].as_str().unwrap().to_string();

    let vote = json!({ "questionId": question_id, "userName": "bob", "roomId": room.room_id });
    emit(&mut client, "upvote-question", vote.clone()).await;
    let updated = next_event(&mut client).await;
    assert_eq!(updated["event"], "question-updated");
    assert_eq!(updated["data"]["votes"], 1);
    next_event(&mut client).await;

    // The repeat is ignored; the ping reply is the next frame
    emit(&mut client, "upvote-question", vote).await;
    emit(&mut client, "ping", Value::Null).await;
    assert_eq!(next_event(&mut client).await["event"], "pong");
}

#[tokio::test]
async fn test_admin_actions_need_the_admin_token() {
    let (addr, state) = spawn_server().await;
    let admin_id = Uuid::new_v4();
    let room = state.room_service.create_room(admin_id, "pw").await.unwrap();
    let token = state
        .auth_service
        .generate_token(admin_id, "host", inquiso::models::UserRole::User)
        .unwrap();

    let mut audience = connect(addr, None).await;
    join(&mut audience, &room.room_id).await;
    emit(&mut audience, "new-question", json!({ "text": "Off topic", "userName": "eve", "roomId": room.room_id })).await;
    let question_id = next_event(&mut audience).await["data"]["id"].as_str().unwrap().to_string();
    next_event(&mut audience).await;

    let action = json!({ "action": "remove", "questionId": question_id, "roomId": room.room_id });
    emit(&mut audience, "admin-action", action.clone()).await;
    let refused = next_event(&mut audience).await;
    assert_eq!(refused["event"], "error");
    assert_eq!(refused["data"]["message"], "You are not the admin of this room");

    let mut host = connect(addr, Some(&token)).await;
    emit(&mut host, "admin-action", action).await;
    let removed = next_event(&mut audience).await;
    assert_eq!(removed["event"], "question-removed");
    assert_eq!(removed["data"], question_id.as_str());

    emit(&mut host, "close-room", json!({ "roomId": room.room_id })).await;
    assert_eq!(next_event(&mut host).await["event"], "room-closed");
    let closed = next_event(&mut audience).await;
    assert_eq!(closed["event"], "room-closed");
    assert_eq!(closed["data"]["roomId"], room.room_id.as_str());
}

#[tokio::test]
async fn test_invalid_token_is_refused_before_upgrade() {
    let (addr, _) = spawn_server().await;
    assert!(connect_async(format!("ws://{}/ws?token=not-a-jwt", addr)).await.is_err());
}
