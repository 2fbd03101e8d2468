//! The counter bridge: mirrors the chat message counter through an
//! external publish/subscribe broker.

pub mod mqtt;

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::frames;
use crate::chat::registry::ConnectionRegistry;

/// Abstraction over the broker link carrying the message counter.
///
/// Backed by MQTT in production, a loopback in tests and local development,
/// and a no-op when no broker is configured.
#[async_trait]
pub trait CounterBridge: Send + Sync {
    /// Fire-and-forget publish of the current counter value. Failures are
    /// logged by the implementation; delivery of chat messages to local
    /// peers never waits on broker availability.
    async fn publish(&self, count: u64);

    /// Close the broker connection on process shutdown.
    async fn shutdown(&self) {}
}

// ---------------------------------------------------------------------------
// No-op implementation (broker not configured)
// ---------------------------------------------------------------------------

/// Used when no broker URL is configured. Chat works without the counter
/// feature; publishes disappear and no counter notices are broadcast.
pub struct NoopBridge;

#[async_trait]
impl CounterBridge for NoopBridge {
    async fn publish(&self, _count: u64) {}
}

// ---------------------------------------------------------------------------
// Loopback implementation (tests / local development)
// ---------------------------------------------------------------------------

/// In-process broker stand-in. Every publish is echoed straight back as a
/// counter notice, the same way a real broker echoes our own publishes on
/// the subscribed topic.
pub struct LoopbackBridge {
    registry: Arc<ConnectionRegistry>,
}

impl LoopbackBridge {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CounterBridge for LoopbackBridge {
    async fn publish(&self, count: u64) {
        self.registry.broadcast(&frames::counter_notice(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::registry::Identity;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn loopback_echoes_publish_as_counter_notice() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(Identity::guest(), tx);

        let bridge = LoopbackBridge::new(registry.clone());
        bridge.publish(7).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            "There are currently 7 messages in the chat."
        );
    }

    #[tokio::test]
    async fn noop_bridge_broadcasts_nothing() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(Identity::guest(), tx);

        NoopBridge.publish(1).await;

        assert!(rx.try_recv().is_err());
    }
}
