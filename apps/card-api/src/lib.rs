pub mod auth;
pub mod bridge;
pub mod chat;
pub mod config;
pub mod directory;
pub mod error;
pub mod routes;

use std::sync::Arc;

use auth::tokens::TokenCodec;
use bridge::CounterBridge;
use chat::registry::ConnectionRegistry;
use config::Config;
use directory::UserDirectory;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: TokenCodec,
    pub users: Arc<dyn UserDirectory>,
    pub registry: Arc<ConnectionRegistry>,
    pub bridge: Arc<dyn CounterBridge>,
}
