//! Message value object
//!
//! Messages ride in `message.received` events; durable message storage is
//! owned by a collaborating service, not this engine.

use crate::core::id::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contribution made by the participant holding the turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: ParticipantId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: ParticipantId,
        content: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender,
            content: content.into(),
            sent_at,
        }
    }
}
