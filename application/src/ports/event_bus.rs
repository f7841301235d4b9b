//! Durable bus port
//!
//! At-least-once delivery with no ordering guarantee across topics.
//! Consumers de-duplicate by the `event_id` carried in every payload.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur against the durable bus
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("Bus connection closed")]
    Closed,
}

/// Cross-service event transport
///
/// Payloads are plain JSON so the port stays protocol-agnostic; the bridge
/// owns serialization of the internal types.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), BusError>;

    /// Subscribe to a topic. Every message published after this call is
    /// delivered to the returned receiver at least once.
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<mpsc::UnboundedReceiver<serde_json::Value>, BusError>;
}
