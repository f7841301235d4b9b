//! Discussion events: the unit shipped to live connections and to the
//! durable bus
//!
//! Events carry an [`EventId`] for receiver-side de-duplication (the bus is
//! at-least-once) and the turn number as a causal ordering hint. Ordering is
//! only guaranteed per connection, never across consumers.

use crate::core::id::{DiscussionId, EventId, ParticipantId, PrincipalId};
use crate::discussion::message::Message;
use crate::discussion::participant::ParticipantRole;
use crate::turn::record::TurnEndReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error code attached to `error` events when a strategy finds no speaker
pub const NO_ELIGIBLE_PARTICIPANT: &str = "no-eligible-participant";

/// A state change observable by clients and collaborating services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionEvent {
    pub event_id: EventId,
    pub discussion_id: DiscussionId,
    /// Causal ordering hint for bus consumers, not a delivery guarantee
    pub turn_number: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DiscussionEventKind,
}

impl DiscussionEvent {
    pub fn new(discussion_id: DiscussionId, turn_number: u64, kind: DiscussionEventKind) -> Self {
        Self {
            event_id: EventId::new(),
            discussion_id,
            turn_number,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Tagged event payloads; the serde tag is the wire-level `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiscussionEventKind {
    #[serde(rename = "discussion.started")]
    DiscussionStarted { started_by: PrincipalId },

    #[serde(rename = "discussion.paused")]
    DiscussionPaused,

    #[serde(rename = "discussion.resumed")]
    DiscussionResumed,

    #[serde(rename = "discussion.ended")]
    DiscussionEnded { reason: String },

    #[serde(rename = "participant.joined")]
    ParticipantJoined {
        participant_id: ParticipantId,
        principal_id: PrincipalId,
        role: ParticipantRole,
    },

    #[serde(rename = "participant.left")]
    ParticipantLeft { participant_id: ParticipantId },

    #[serde(rename = "turn.changed")]
    TurnChanged {
        participant_id: ParticipantId,
        expected_end_at: Option<DateTime<Utc>>,
        /// Why the previous turn ended; absent for the first assignment
        previous_turn_reason: Option<TurnEndReason>,
    },

    #[serde(rename = "message.received")]
    MessageReceived { message: Message },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl DiscussionEventKind {
    /// Wire-level event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            DiscussionEventKind::DiscussionStarted { .. } => "discussion.started",
            DiscussionEventKind::DiscussionPaused => "discussion.paused",
            DiscussionEventKind::DiscussionResumed => "discussion.resumed",
            DiscussionEventKind::DiscussionEnded { .. } => "discussion.ended",
            DiscussionEventKind::ParticipantJoined { .. } => "participant.joined",
            DiscussionEventKind::ParticipantLeft { .. } => "participant.left",
            DiscussionEventKind::TurnChanged { .. } => "turn.changed",
            DiscussionEventKind::MessageReceived { .. } => "message.received",
            DiscussionEventKind::Error { .. } => "error",
        }
    }
}
