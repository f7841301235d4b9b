//! Cross-service bridge
//!
//! Outbound: every internal event is queued to a publisher worker that
//! ships it to the durable bus with retry and backoff; internal state has
//! already advanced by then, so a publish failure never fails the command
//! that produced the event. Inbound: bus commands are de-duplicated by
//! `event_id` and dispatched through the same engine methods as client
//! commands, so they pass identical validation.

use crate::engine::DiscussionEngine;
use crate::ports::event_bus::{BusError, EventBus};
use parley_domain::{DiscussionEvent, DiscussionId, EventId, ParticipantId, PrincipalId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Bridge tuning
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub outbound_topic: String,
    pub inbound_topic: String,
    pub publish_max_retries: u32,
    pub publish_backoff_ms: u64,
    /// How many applied event ids the inbound de-duplication window keeps
    pub dedup_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            outbound_topic: "discussion.events".into(),
            inbound_topic: "discussion.commands".into(),
            publish_max_retries: 5,
            publish_backoff_ms: 250,
            dedup_capacity: 1024,
        }
    }
}

/// Envelope for commands arriving from the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// De-duplication key: a replayed envelope is applied at most once
    pub event_id: EventId,
    pub discussion_id: DiscussionId,
    #[serde(flatten)]
    pub command: BridgeCommand,
}

/// Commands collaborating services may issue over the bus
///
/// Deliberately the same vocabulary as the client surface: a tool-result
/// injection is just `add-message`, an agent finishing its turn is just
/// `advance-turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum BridgeCommand {
    AddMessage {
        sender: PrincipalId,
        content: String,
    },
    AdvanceTurn {
        requested_by: PrincipalId,
        target: Option<ParticipantId>,
    },
}

/// Translates internal events to bus messages and bus commands to engine
/// calls
pub struct CrossServiceBridge {
    bus: Arc<dyn EventBus>,
    config: BridgeConfig,
    outbound_tx: mpsc::UnboundedSender<DiscussionEvent>,
    shutdown: CancellationToken,
}

impl CrossServiceBridge {
    /// Create the bridge and spawn its outbound publisher worker
    pub fn new(bus: Arc<dyn EventBus>, config: BridgeConfig, shutdown: CancellationToken) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::outbound_worker(
            bus.clone(),
            config.clone(),
            shutdown.clone(),
            outbound_rx,
        ));
        Self {
            bus,
            config,
            outbound_tx,
            shutdown,
        }
    }

    /// Queue handle the engine's actors publish through
    pub fn outbound_sender(&self) -> mpsc::UnboundedSender<DiscussionEvent> {
        self.outbound_tx.clone()
    }

    /// Subscribe to the inbound topic and pump commands into the engine
    pub async fn spawn_inbound(&self, engine: Arc<DiscussionEngine>) -> Result<(), BusError> {
        let mut rx = self.bus.subscribe(&self.config.inbound_topic).await?;
        let shutdown = self.shutdown.clone();
        let capacity = self.config.dedup_capacity;
        tokio::spawn(async move {
            let mut seen = DedupWindow::new(capacity);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    payload = rx.recv() => match payload {
                        Some(payload) => Self::handle_inbound(&engine, &mut seen, payload).await,
                        None => break,
                    }
                }
            }
        });
        Ok(())
    }

    async fn outbound_worker(
        bus: Arc<dyn EventBus>,
        config: BridgeConfig,
        shutdown: CancellationToken,
        mut rx: mpsc::UnboundedReceiver<DiscussionEvent>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => Self::publish_with_retry(bus.as_ref(), &config, event).await,
                    None => break,
                }
            }
        }
    }

    async fn publish_with_retry(bus: &dyn EventBus, config: &BridgeConfig, event: DiscussionEvent) {
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(event_id = %event.event_id, %error, "Unserializable event dropped");
                return;
            }
        };

        let mut backoff = Duration::from_millis(config.publish_backoff_ms);
        for attempt in 0..=config.publish_max_retries {
            match bus.publish(&config.outbound_topic, payload.clone()).await {
                Ok(()) => {
                    trace!(
                        event_id = %event.event_id,
                        topic = %config.outbound_topic,
                        "Event published to bus"
                    );
                    return;
                }
                Err(error) => {
                    warn!(
                        event_id = %event.event_id,
                        attempt,
                        %error,
                        "Bus publish failed"
                    );
                    if attempt < config.publish_max_retries {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        warn!(
            event_id = %event.event_id,
            retries = config.publish_max_retries,
            "Giving up on bus publish"
        );
    }

    async fn handle_inbound(
        engine: &DiscussionEngine,
        seen: &mut DedupWindow,
        payload: serde_json::Value,
    ) {
        let envelope: InboundEnvelope = match serde_json::from_value(payload) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, "Malformed inbound bus message dropped");
                return;
            }
        };
        if !seen.insert(envelope.event_id) {
            debug!(event_id = %envelope.event_id, "Duplicate inbound message dropped");
            return;
        }

        let result = match envelope.command {
            BridgeCommand::AddMessage { sender, content } => {
                engine
                    .send_message(&envelope.discussion_id, sender, content)
                    .await
            }
            BridgeCommand::AdvanceTurn {
                requested_by,
                target,
            } => {
                engine
                    .advance_turn(&envelope.discussion_id, requested_by, target)
                    .await
            }
        };
        if let Err(error) = result {
            warn!(
                discussion_id = %envelope.discussion_id,
                event_id = %envelope.event_id,
                %error,
                "Inbound bus command rejected"
            );
        }
    }
}

/// Bounded insertion-order window of already-applied event ids
struct DedupWindow {
    seen: HashSet<EventId>,
    order: VecDeque<EventId>,
    capacity: usize,
}

impl DedupWindow {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns `false` when the id was already present
    fn insert(&mut self, id: EventId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }
}
