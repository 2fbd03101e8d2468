#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite;

use card_api::auth::roles::Role;
use card_api::auth::tokens::TokenCodec;
use card_api::bridge::{CounterBridge, LoopbackBridge, NoopBridge};
use card_api::chat::registry::ConnectionRegistry;
use card_api::config::Config;
use card_api::directory::{MemoryDirectory, UserDirectory};
use card_api::AppState;

pub const TEST_SECRET: &str = "test-secret-do-not-use-in-production";

/// Seeded test users: (username, password, role).
pub const USERS: &[(&str, &str, Role)] = &[
    ("admin", "s3cret-admin", Role::Admin),
    ("alice", "hunter2", Role::Moderator),
    ("bob", "password123", Role::User),
];

fn test_config() -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiration_secs: 3600,
        port: 0,
        broker: None,
    }
}

fn seeded_directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    for (username, password, role) in USERS {
        directory
            .insert(username, password, *role)
            .expect("seed test user");
    }
    directory
}

/// Build a test AppState. The counter bridge is a no-op unless
/// `test_state_with_loopback` is used.
pub fn test_state() -> AppState {
    build_state(|_registry| Arc::new(NoopBridge))
}

/// Build a test AppState whose bridge echoes every publish back as a
/// counter notice, standing in for the broker round trip.
pub fn test_state_with_loopback() -> AppState {
    build_state(|registry| Arc::new(LoopbackBridge::new(registry)))
}

fn build_state(
    bridge: impl FnOnce(Arc<ConnectionRegistry>) -> Arc<dyn CounterBridge>,
) -> AppState {
    let config = test_config();
    let codec = TokenCodec::new(&config.jwt_secret, config.jwt_expiration_secs);
    let registry = Arc::new(ConnectionRegistry::new());
    let users: Arc<dyn UserDirectory> = Arc::new(seeded_directory());

    AppState {
        config: Arc::new(config),
        bridge: bridge(registry.clone()),
        codec,
        users,
        registry,
    }
}

/// Build the full application router wired to the given state.
pub fn test_app(state: AppState) -> Router {
    card_api::routes::router().with_state(state)
}

/// Mint a token for a seeded user straight from the codec.
pub fn mint_token(state: &AppState, sub: &str, name: &str, role: Role) -> String {
    state.codec.issue(sub, name, role).expect("mint test token")
}

/// Mint a token that expired in the past, signed with the real secret.
pub fn mint_expired_token(name: &str) -> String {
    TokenCodec::new(TEST_SECRET, -300)
        .issue("usr_expired", name, Role::User)
        .expect("mint expired token")
}

/// Start an actual TCP server for WebSocket testing. Returns the bound
/// address; the server runs in the background.
pub async fn start_ws_server(state: AppState) -> SocketAddr {
    let app = test_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect to the chat endpoint, optionally with a `?token=` parameter.
pub async fn connect_chat(addr: SocketAddr, token: Option<&str>) -> WsStream {
    let url = match token {
        Some(token) => format!("ws://{addr}/ws?token={token}"),
        None => format!("ws://{addr}/ws"),
    };
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws_stream
}

/// Read the next text frame, failing the test after a timeout.
pub async fn next_text(ws: &mut WsStream) -> String {
    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout waiting for frame")
        .expect("stream ended")
        .expect("ws read error");
    msg.into_text().expect("not text").to_string()
}

/// Send a chat message (raw text) over the socket.
pub async fn send_text(ws: &mut WsStream, body: &str) {
    ws.send(tungstenite::Message::Text(body.to_string().into()))
        .await
        .expect("send chat message");
}

/// Connect and consume the welcome frame, asserting its contents.
pub async fn connect_and_welcome(
    addr: SocketAddr,
    token: Option<&str>,
    expected_welcome: &str,
) -> WsStream {
    let mut ws = connect_chat(addr, token).await;
    assert_eq!(next_text(&mut ws).await, expected_welcome);
    ws
}
