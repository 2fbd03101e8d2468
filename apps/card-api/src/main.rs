use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use card_api::auth::roles::Role;
use card_api::auth::tokens::TokenCodec;
use card_api::bridge::mqtt::MqttBridge;
use card_api::bridge::{CounterBridge, NoopBridge};
use card_api::chat::registry::ConnectionRegistry;
use card_api::config::Config;
use card_api::directory::{MemoryDirectory, UserDirectory};
use card_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let codec = TokenCodec::new(&config.jwt_secret, config.jwt_expiration_secs);
    let registry = Arc::new(ConnectionRegistry::new());

    // Without a broker the chat still works; only the counter notices stop.
    let bridge: Arc<dyn CounterBridge> = match &config.broker {
        Some(broker) => {
            tracing::info!(host = %broker.host, port = broker.port, "counter bridge enabled");
            Arc::new(MqttBridge::connect(broker, registry.clone()))
        }
        None => {
            tracing::warn!("MQTT_URL_BACKEND not set, counter bridge disabled");
            Arc::new(NoopBridge)
        }
    };

    // In-memory user directory; the card/deck persistence service owns the
    // real user records.
    let users = MemoryDirectory::new();
    if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
        users
            .insert("admin", &password, Role::Admin)
            .expect("seed admin user");
        tracing::info!("seeded admin user");
    }
    let users: Arc<dyn UserDirectory> = Arc::new(users);

    let state = AppState {
        config: Arc::new(config),
        codec,
        users,
        registry,
        bridge: bridge.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(card_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "card-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // In-flight broadcasts are not drained; only the broker link is closed.
    bridge.shutdown().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
