//! In-memory event bus
//!
//! Per-topic fan-out over unbounded channels. Delivery to every subscriber
//! makes at-least-once trivially true; replays are produced by publishing
//! the same payload again, which tests do to exercise consumer-side
//! de-duplication.

use async_trait::async_trait;
use parley_application::ports::event_bus::{BusError, EventBus};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Default)]
pub struct InMemoryEventBus {
    topics: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<serde_json::Value>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriber count for a topic (test helper)
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .map(|topics| {
                topics
                    .get(topic)
                    .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), BusError> {
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| BusError::PublishFailed("bus mutex poisoned".into()))?;
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
            trace!(topic, subscribers = subscribers.len(), "Bus message delivered");
        }
        // A durable bus accepts messages with or without live consumers
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<mpsc::UnboundedReceiver<serde_json::Value>, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| BusError::SubscribeFailed("bus mutex poisoned".into()))?;
        topics.entry(topic.to_string()).or_default().push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = InMemoryEventBus::new();
        let mut first = bus.subscribe("events").await.unwrap();
        let mut second = bus.subscribe("events").await.unwrap();

        bus.publish("events", serde_json::json!({"n": 1}))
            .await
            .unwrap();

        assert_eq!(first.recv().await.unwrap()["n"], 1);
        assert_eq!(second.recv().await.unwrap()["n"], 1);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = InMemoryEventBus::new();
        let mut commands = bus.subscribe("commands").await.unwrap();

        bus.publish("events", serde_json::json!({"n": 1}))
            .await
            .unwrap();
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let bus = InMemoryEventBus::new();
        bus.publish("events", serde_json::json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let bus = InMemoryEventBus::new();
        let rx = bus.subscribe("events").await.unwrap();
        drop(rx);

        bus.publish("events", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(bus.subscriber_count("events"), 0);
    }
}
