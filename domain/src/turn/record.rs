//! Append-only turn records and the history view over them

use crate::core::id::{DiscussionId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnEndReason {
    /// The per-turn time budget elapsed
    Timeout,
    /// The speaker (or the flow that owns them) finished explicitly
    Explicit,
    /// The speaker was removed or otherwise skipped over
    Skipped,
    /// A moderator forced the advance
    ModeratorOverride,
}

impl TurnEndReason {
    pub fn as_str(&self) -> &str {
        match self {
            TurnEndReason::Timeout => "timeout",
            TurnEndReason::Explicit => "explicit",
            TurnEndReason::Skipped => "skipped",
            TurnEndReason::ModeratorOverride => "moderator-override",
        }
    }
}

impl std::fmt::Display for TurnEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One completed turn (append-only, audit + strategy input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub discussion_id: DiscussionId,
    pub turn_number: u64,
    pub participant_id: ParticipantId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub reason: TurnEndReason,
}

impl TurnRecord {
    /// How long the speaker actually held the turn, in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.ended_at - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }
}

/// The turn records observed so far for one discussion
///
/// Strategies consult this for per-participant cooldowns and historical
/// response-time estimation.
#[derive(Debug, Clone, Default)]
pub struct TurnHistory {
    records: Vec<TurnRecord>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TurnRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the given participant last finished a turn
    pub fn last_turn_end_for(&self, participant_id: &ParticipantId) -> Option<DateTime<Utc>> {
        self.records
            .iter()
            .rev()
            .find(|r| &r.participant_id == participant_id)
            .map(|r| r.ended_at)
    }

    /// Mean observed turn duration for the given participant, in seconds
    ///
    /// Only turns the participant actually finished themselves count;
    /// skipped turns say nothing about their response time.
    pub fn mean_response_seconds(&self, participant_id: &ParticipantId) -> Option<f64> {
        let durations: Vec<f64> = self
            .records
            .iter()
            .filter(|r| &r.participant_id == participant_id && r.reason != TurnEndReason::Skipped)
            .map(|r| r.duration_seconds())
            .collect();
        if durations.is_empty() {
            return None;
        }
        Some(durations.iter().sum::<f64>() / durations.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(turn: u64, participant: &str, secs: i64, reason: TurnEndReason) -> TurnRecord {
        let started = Utc::now();
        TurnRecord {
            discussion_id: "disc-1".into(),
            turn_number: turn,
            participant_id: participant.into(),
            started_at: started,
            ended_at: started + chrono::Duration::seconds(secs),
            reason,
        }
    }

    #[test]
    fn test_duration_seconds() {
        let r = record(1, "p-1", 90, TurnEndReason::Explicit);
        assert_eq!(r.duration_seconds(), 90.0);
    }

    #[test]
    fn test_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&TurnEndReason::ModeratorOverride).unwrap(),
            "\"moderator-override\""
        );
        assert_eq!(TurnEndReason::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_last_turn_end_for() {
        let mut history = TurnHistory::new();
        assert!(history.last_turn_end_for(&"p-1".into()).is_none());

        let first = record(1, "p-1", 10, TurnEndReason::Explicit);
        let second = record(2, "p-1", 20, TurnEndReason::Timeout);
        let expected = second.ended_at;
        history.push(first);
        history.push(second);

        assert_eq!(history.last_turn_end_for(&"p-1".into()), Some(expected));
        assert!(history.last_turn_end_for(&"p-2".into()).is_none());
    }

    #[test]
    fn test_mean_response_ignores_skipped_turns() {
        let mut history = TurnHistory::new();
        history.push(record(1, "p-1", 100, TurnEndReason::Explicit));
        history.push(record(2, "p-1", 200, TurnEndReason::Timeout));
        history.push(record(3, "p-1", 5, TurnEndReason::Skipped));

        assert_eq!(history.mean_response_seconds(&"p-1".into()), Some(150.0));
        assert!(history.mean_response_seconds(&"p-2".into()).is_none());
    }
}
