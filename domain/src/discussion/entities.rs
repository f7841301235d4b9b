//! Discussion domain entities

use crate::core::id::{DiscussionId, ParticipantId, PrincipalId};
use crate::discussion::settings::DiscussionSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a discussion
///
/// `Ended` is terminal and reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionPhase {
    /// Created but not yet started; participants are being assembled
    Draft,
    /// Turn-taking is in progress
    Active,
    /// Frozen; the remaining turn-time budget is preserved
    Paused,
    /// Finalized; no further commands are accepted
    Ended,
}

impl DiscussionPhase {
    pub fn as_str(&self) -> &str {
        match self {
            DiscussionPhase::Draft => "draft",
            DiscussionPhase::Active => "active",
            DiscussionPhase::Paused => "paused",
            DiscussionPhase::Ended => "ended",
        }
    }

    /// Whether this phase accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscussionPhase::Ended)
    }
}

impl std::fmt::Display for DiscussionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The turn currently in flight
///
/// `turn_number` is monotonically non-decreasing for the lifetime of a
/// discussion and is 1-based once the first speaker has been assigned;
/// a freshly started discussion sits at `{0, None}` until the scheduler
/// performs the first assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTurn {
    pub turn_number: u64,
    pub participant_id: Option<ParticipantId>,
    pub started_at: Option<DateTime<Utc>>,
    pub expected_end_at: Option<DateTime<Utc>>,
}

impl CurrentTurn {
    /// The state before any speaker has been assigned
    pub fn unassigned() -> Self {
        Self {
            turn_number: 0,
            participant_id: None,
            started_at: None,
            expected_end_at: None,
        }
    }

    /// Whether a speaker currently holds the turn
    pub fn is_assigned(&self) -> bool {
        self.participant_id.is_some()
    }
}

/// A multi-participant discussion (aggregate root)
///
/// Phase transitions are owned by the lifecycle manager and `current_turn`
/// mutation by the turn scheduler; both run inside the same per-discussion
/// serialization domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    pub id: DiscussionId,
    pub topic: String,
    pub title: String,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub phase: DiscussionPhase,
    pub settings: DiscussionSettings,
    pub current_turn: CurrentTurn,
    /// Optimistic concurrency token; the store bumps it on every save.
    pub version: u64,
}

impl Discussion {
    pub fn new(
        id: impl Into<DiscussionId>,
        topic: impl Into<String>,
        title: impl Into<String>,
        created_by: impl Into<PrincipalId>,
        settings: DiscussionSettings,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            title: title.into(),
            created_by: created_by.into(),
            created_at,
            phase: DiscussionPhase::Draft,
            settings,
            current_turn: CurrentTurn::unassigned(),
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether the given participant holds the current turn
    pub fn is_current_speaker(&self, participant_id: &ParticipantId) -> bool {
        self.current_turn.participant_id.as_ref() == Some(participant_id)
    }
}
