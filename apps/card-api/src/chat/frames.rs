//! Outbound chat frame formats.
//!
//! All frames are plain text. Clients receive one of: a welcome notice, a
//! peer chat line, a counter notice, or the refusal notice sent immediately
//! before a handshake close.

use super::registry::Identity;

/// The single frame sent to a client that presented an unverifiable token.
pub const REFUSAL: &str = "Invalid token!";

/// One-line welcome sent when a connection enters the open state.
pub fn welcome(identity: &Identity) -> String {
    format!("Welcome, {} ({})!", identity.name, identity.role)
}

/// A chat message envelope: sender name and role from the handshake-time
/// claims, body as received. Nothing but the body is trusted from the
/// client.
pub fn chat_line(identity: &Identity, body: &str) -> String {
    format!("{} ({}): {}", identity.name, identity.role, body)
}

/// Informational notice broadcast when the broker reports a counter update.
pub fn counter_notice(count: u64) -> String {
    format!("There are currently {count} messages in the chat.")
}
