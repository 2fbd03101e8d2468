//! WebSocket upgrade handler and per-connection chat loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::AppState;

use super::frames;
use super::registry::Identity;

/// Optional bearer credential carried in the connection URL.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query.token))
}

/// Per-connection lifecycle: Connecting → Open → Closed.
async fn handle_connection(socket: WebSocket, state: AppState, token: Option<String>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Handshake. A missing token degrades the connection to Guest; a token
    // that is present but unverifiable is fatal: one refusal frame, then
    // close, never registered.
    let identity = match token.as_deref() {
        None => Identity::guest(),
        Some(token) => match state.codec.verify(token) {
            Ok(claims) => Identity::from(&claims),
            Err(err) => {
                tracing::debug!(%err, "chat handshake refused");
                let _ = ws_tx.send(Message::Text(frames::REFUSAL.into())).await;
                let _ = ws_tx.send(Message::Close(None)).await;
                return;
            }
        },
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Queue the welcome before registering so no broadcast can overtake it.
    let _ = tx.send(frames::welcome(&identity));

    let conn_id = state.registry.add(identity.clone(), tx);

    tracing::info!(
        conn_id = %conn_id,
        name = %identity.name,
        role = %identity.role,
        "chat connection open"
    );

    // Writer task: pumps queued frames into the socket. Ends when the
    // registry entry (holding the only sender) is dropped.
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Read loop. Inbound frames are raw chat text; processing them serially
    // preserves per-sender ordering.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(body)) => {
                let count = state.registry.record_message();
                state.bridge.publish(count).await;
                state
                    .registry
                    .broadcast(&frames::chat_line(&identity, &body));
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(?err, conn_id = %conn_id, "ws read error");
                break;
            }
        }
    }

    state.registry.remove(&conn_id);
    let _ = writer.await;

    tracing::info!(conn_id = %conn_id, "chat connection closed");
}
