//! Channel-backed connection sink
//!
//! Each registered connection gets its own unbounded channel, so one slow
//! or dead consumer never blocks delivery to the others — exactly the
//! contract the broadcaster's fire-and-forget fan-out relies on.

use parley_application::ports::connection_sink::ConnectionSink;
use parley_domain::{ConnectionId, DiscussionEvent};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

#[derive(Default)]
pub struct ChannelConnectionSink {
    connections: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<DiscussionEvent>>>,
}

impl ChannelConnectionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; the caller drains the returned receiver
    pub fn register(
        &self,
        connection_id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<DiscussionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut connections) = self.connections.lock() {
            connections.insert(connection_id, tx);
        }
        rx
    }

    pub fn disconnect(&self, connection_id: &ConnectionId) {
        if let Ok(mut connections) = self.connections.lock() {
            connections.remove(connection_id);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl ConnectionSink for ChannelConnectionSink {
    fn send(&self, connection_id: &ConnectionId, event: &DiscussionEvent) {
        let Ok(mut connections) = self.connections.lock() else {
            return;
        };
        match connections.get(connection_id) {
            Some(tx) => {
                if tx.send(event.clone()).is_err() {
                    // Receiver dropped without an explicit disconnect
                    warn!(connection_id = %connection_id, "Dropping dead connection");
                    connections.remove(connection_id);
                }
            }
            None => {
                trace!(connection_id = %connection_id, "Send to unknown connection ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::DiscussionEventKind;

    fn event() -> DiscussionEvent {
        DiscussionEvent::new("disc-1".into(), 1, DiscussionEventKind::DiscussionResumed)
    }

    #[tokio::test]
    async fn test_registered_connection_receives_events() {
        let sink = ChannelConnectionSink::new();
        let mut rx = sink.register("conn-1".into());

        sink.send(&"conn-1".into(), &event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, DiscussionEventKind::DiscussionResumed);
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_ignored() {
        let sink = ChannelConnectionSink::new();
        sink.send(&"ghost".into(), &event());
        assert_eq!(sink.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_connection_is_pruned_on_send() {
        let sink = ChannelConnectionSink::new();
        let rx = sink.register("conn-1".into());
        drop(rx);

        sink.send(&"conn-1".into(), &event());
        assert_eq!(sink.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_removes_connection() {
        let sink = ChannelConnectionSink::new();
        let _rx = sink.register("conn-1".into());
        sink.disconnect(&"conn-1".into());
        assert_eq!(sink.connection_count(), 0);
    }
}
