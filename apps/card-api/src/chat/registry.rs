//! The set of open chat connections and the shared message counter.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use cardlib_common::id::{prefix, prefixed_ulid};

use crate::auth::roles::Role;
use crate::auth::tokens::Claims;

/// Identity snapshot fixed at handshake time. The role does not change for
/// the life of the connection, even if the credential is later revoked.
#[derive(Debug, Clone)]
pub struct Identity {
    pub sub: String,
    pub name: String,
    pub role: Role,
}

impl Identity {
    /// The unprivileged identity assigned to connections presenting no
    /// credential.
    pub fn guest() -> Self {
        Self {
            sub: "guest".to_string(),
            name: "Guest".to_string(),
            role: Role::Guest,
        }
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            sub: claims.sub.clone(),
            name: claims.name.clone(),
            role: claims.role,
        }
    }
}

/// One registered connection: its identity and the channel feeding its
/// writer task.
struct ConnectionHandle {
    identity: Identity,
    sender: mpsc::UnboundedSender<String>,
}

/// Shared registry of all open chat connections.
///
/// Uses `DashMap` for shard-level concurrency, keyed by a `conn_` prefixed
/// ULID. The message counter lives here because every accepted message is a
/// writer; `fetch_add` keeps concurrent increments lossless.
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionHandle>,
    messages: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            messages: AtomicU64::new(0),
        }
    }

    /// Register a new open connection and return its ID. A user may hold
    /// any number of simultaneous connections.
    pub fn add(&self, identity: Identity, sender: mpsc::UnboundedSender<String>) -> String {
        let id = prefixed_ulid(prefix::CONNECTION);
        self.connections
            .insert(id.clone(), ConnectionHandle { identity, sender });
        id
    }

    /// Remove a connection. Idempotent: removing an unknown or
    /// already-removed ID is a no-op, which tolerates peer-close racing
    /// error-close.
    pub fn remove(&self, id: &str) {
        self.connections.remove(id);
    }

    /// Send `text` to every open connection. A connection whose channel
    /// rejects the write has already hung up; it is dropped in the same
    /// pass instead of surfacing the failure to the caller.
    pub fn broadcast(&self, text: &str) {
        self.connections.retain(|id, handle| {
            let delivered = handle.sender.send(text.to_string()).is_ok();
            if !delivered {
                tracing::debug!(conn_id = %id, "dropping closed connection during broadcast");
            }
            delivered
        });
    }

    /// Record one accepted chat message and return the new counter value.
    pub fn record_message(&self) -> u64 {
        self.messages.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The number of messages accepted since the process started.
    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// The number of currently open connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// The identity a connection was registered with, if still open.
    pub fn identity(&self, id: &str) -> Option<Identity> {
        self.connections.get(id).map(|h| h.identity.clone())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
