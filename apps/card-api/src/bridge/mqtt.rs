//! MQTT-backed counter bridge.
//!
//! One long-lived client both publishes the counter and subscribes to the
//! same topic. Updates arriving on the subscription may come from another
//! gateway process sharing the broker, or be echoes of our own publishes;
//! both are broadcast to local connections as counter notices.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use cardlib_common::id::prefixed_ulid;

use crate::bridge::CounterBridge;
use crate::chat::frames;
use crate::chat::registry::ConnectionRegistry;
use crate::config::BrokerConfig;

/// The topic carrying the counter as an ASCII decimal string.
pub const COUNTER_TOPIC: &str = "chat/messages/count";

/// How long to wait before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct MqttBridge {
    client: AsyncClient,
}

impl MqttBridge {
    /// Connect to the broker and spawn the event-loop task that owns the
    /// subscription. Connection failures are retried inside the task; the
    /// bridge itself is usable immediately.
    pub fn connect(config: &BrokerConfig, registry: Arc<ConnectionRegistry>) -> Self {
        let mut options = MqttOptions::new(client_id(), &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.as_deref().unwrap_or(""));
        }

        let (client, event_loop) = AsyncClient::new(options, 64);
        tokio::spawn(run_event_loop(client.clone(), event_loop, registry));

        Self { client }
    }
}

#[async_trait]
impl CounterBridge for MqttBridge {
    async fn publish(&self, count: u64) {
        // Non-blocking send: with the broker down nothing drains the request
        // queue, and a queue-full publish must not stall the caller.
        if let Err(err) =
            self.client
                .try_publish(COUNTER_TOPIC, QoS::AtLeastOnce, false, count.to_string())
        {
            tracing::warn!(%err, count, "counter publish failed");
        }
    }

    async fn shutdown(&self) {
        if let Err(err) = self.client.try_disconnect() {
            tracing::debug!(%err, "broker disconnect failed");
        }
    }
}

/// Client id for this gateway process. Unique per process: several
/// gateways may share the counter topic on one broker, and brokers
/// disconnect an existing session when its ClientId reconnects.
fn client_id() -> String {
    prefixed_ulid("card-api")
}

/// Subscription side: every message on the counter topic becomes a
/// broadcast notice to all local connections.
async fn run_event_loop(
    client: AsyncClient,
    mut event_loop: EventLoop,
    registry: Arc<ConnectionRegistry>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!(topic = COUNTER_TOPIC, "broker connected, subscribing");
                if let Err(err) = client.subscribe(COUNTER_TOPIC, QoS::AtLeastOnce).await {
                    tracing::warn!(%err, "counter topic subscribe failed");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let count = std::str::from_utf8(&publish.payload)
                    .ok()
                    .and_then(|s| s.trim().parse::<u64>().ok());
                match count {
                    Some(count) => registry.broadcast(&frames::counter_notice(count)),
                    None => {
                        tracing::warn!(topic = %publish.topic, "ignoring non-numeric counter payload")
                    }
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "broker connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_broker() -> BrokerConfig {
        // Nothing listens on port 1; the event loop keeps retrying and
        // never drains the request queue.
        BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn publish_never_blocks_while_broker_is_down() {
        let registry = Arc::new(ConnectionRegistry::new());
        let bridge = MqttBridge::connect(&unreachable_broker(), registry);

        // Well past the request-queue capacity: every call must return
        // promptly, with overflow logged instead of awaited.
        tokio::time::timeout(Duration::from_secs(5), async {
            for count in 0..100 {
                bridge.publish(count).await;
            }
        })
        .await
        .expect("publish stalled with the broker unreachable");
    }

    #[test]
    fn client_ids_are_unique_per_process() {
        let a = client_id();
        let b = client_id();
        assert!(a.starts_with("card-api_"));
        assert_ne!(a, b);
    }
}
