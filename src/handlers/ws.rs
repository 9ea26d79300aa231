//! WebSocket transport: accept connections, take `join` announcements, and
//! keep the presence registry in step with connection lifetimes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::event::ClientMessage;
use crate::models::presence::{ConnectionId, UserId};
use crate::services::Outbound;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Optional JWT. When present, the connection may only join as the token's user.
    #[serde(default)]
    pub token: Option<String>,
}

/// Upgrade HTTP to WebSocket. A supplied token is validated before upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let bound_user = match params.token.as_deref() {
        Some(token) => Some(state.jwt_secret().validate(token)?.user_id),
        None => None,
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, bound_user)))
}

/// What to do with one inbound text frame.
#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Announce(UserId),
    Pong,
    Reject(String),
}

pub(crate) fn interpret(text: &str, bound_user: Option<UserId>) -> Command {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Join { data }) => match bound_user {
            Some(bound) if bound != data.user_id => {
                Command::Reject("join does not match authenticated user".to_string())
            }
            _ => Command::Announce(data.user_id),
        },
        Ok(ClientMessage::Ping) => Command::Pong,
        Err(e) => Command::Reject(format!("invalid message: {}", e)),
    }
}

fn frame(event: &str, data: serde_json::Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

async fn handle_socket(state: AppState, socket: WebSocket, bound_user: Option<UserId>) {
    let connection_id = ConnectionId::generate();
    info!(connection_id = %connection_id, "ws connected");

    let (mut sender, mut receiver) = socket.split();

    let established = frame(
        "connection_established",
        json!({ "connection_id": connection_id }),
    );
    if sender.send(Message::Text(established)).await.is_err() {
        return;
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });
    state
        .connections
        .attach(connection_id.clone(), Arc::new(tx.clone()))
        .await;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match interpret(&text, bound_user) {
                Command::Announce(user_id) => {
                    state
                        .presence
                        .register_connection(user_id, connection_id.clone())
                        .await;
                    tx.push(&frame("joined", json!({ "user_id": user_id })));
                }
                Command::Pong => {
                    tx.push(&frame("pong", json!({})));
                }
                Command::Reject(message) => {
                    debug!(connection_id = %connection_id, %message, "rejected client frame");
                    tx.push(&frame("error", json!({ "message": message })));
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Presence goes first so no fan-out resolves this connection after it is detached.
    let offline = state.presence.remove_connection(&connection_id).await;
    if !state.connections.detach(&connection_id).await {
        warn!(connection_id = %connection_id, "connection was not attached");
    }

    send_task.abort();
    info!(connection_id = %connection_id, went_offline = offline.len(), "ws disconnected");
}

#[cfg(test)]
mod tests {
    use super::{frame, interpret, Command};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn join_announces_user() {
        let user = Uuid::new_v4();
        let text = json!({ "event": "join", "data": { "user_id": user } }).to_string();
        assert_eq!(interpret(&text, None), Command::Announce(user));
        assert_eq!(interpret(&text, Some(user)), Command::Announce(user));
    }

    #[test]
    fn join_as_someone_else_is_rejected_when_token_bound() {
        let text = json!({ "event": "join", "data": { "user_id": Uuid::new_v4() } }).to_string();
        assert!(matches!(
            interpret(&text, Some(Uuid::new_v4())),
            Command::Reject(_)
        ));
    }

    #[test]
    fn ping_and_garbage() {
        assert_eq!(interpret(r#"{"event":"ping"}"#, None), Command::Pong);
        assert!(matches!(interpret("hello", None), Command::Reject(_)));
        assert!(matches!(
            interpret(r#"{"event":"subscribe"}"#, None),
            Command::Reject(_)
        ));
    }

    #[test]
    fn frames_are_event_envelopes() {
        let parsed: serde_json::Value =
            serde_json::from_str(&frame("pong", json!({}))).unwrap();
        assert_eq!(parsed, json!({ "event": "pong", "data": {} }));
    }
}
