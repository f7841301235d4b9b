//! Participant entity

use crate::core::id::{DiscussionId, ParticipantId, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a participant in a discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Participant,
    Moderator,
}

/// Optional per-participant hints honored by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantPreferences {
    /// Extra seconds this participant would like before their turn times out
    pub response_delay_seconds: Option<u64>,
}

/// A member of exactly one discussion (Entity)
///
/// `discussion_id` is a back-reference, not an ownership edge. Deactivated
/// participants are skipped by every strategy but retain their history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub discussion_id: DiscussionId,
    pub principal_id: PrincipalId,
    pub role: ParticipantRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub message_count: u64,
    /// Declared expertise: topic area -> score in [0, 1]
    #[serde(default)]
    pub expertise: BTreeMap<String, f64>,
    #[serde(default)]
    pub preferences: ParticipantPreferences,
}

impl Participant {
    pub fn new(
        id: impl Into<ParticipantId>,
        discussion_id: DiscussionId,
        principal_id: impl Into<PrincipalId>,
        role: ParticipantRole,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            discussion_id,
            principal_id: principal_id.into(),
            role,
            is_active: true,
            joined_at,
            last_active_at: joined_at,
            message_count: 0,
            expertise: BTreeMap::new(),
            preferences: ParticipantPreferences::default(),
        }
    }

    pub fn with_expertise(mut self, area: impl Into<String>, score: f64) -> Self {
        self.expertise.insert(area.into(), score.clamp(0.0, 1.0));
        self
    }

    pub fn with_preferences(mut self, preferences: ParticipantPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn is_moderator(&self) -> bool {
        self.role == ParticipantRole::Moderator
    }

    /// Record a contributed message
    pub fn record_message(&mut self, at: DateTime<Utc>) {
        self.message_count += 1;
        self.last_active_at = at;
    }

    /// Deactivate without discarding history
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_participant() -> Participant {
        Participant::new(
            "p-1",
            DiscussionId::new("disc-1"),
            "user-1",
            ParticipantRole::Participant,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_participant_is_active() {
        let p = make_participant();
        assert!(p.is_active);
        assert_eq!(p.message_count, 0);
        assert_eq!(p.joined_at, p.last_active_at);
        assert!(!p.is_moderator());
    }

    #[test]
    fn test_record_message_bumps_activity() {
        let mut p = make_participant();
        let later = p.joined_at + chrono::Duration::seconds(42);
        p.record_message(later);
        assert_eq!(p.message_count, 1);
        assert_eq!(p.last_active_at, later);
    }

    #[test]
    fn test_deactivate_keeps_history() {
        let mut p = make_participant();
        p.record_message(Utc::now());
        p.deactivate();
        assert!(!p.is_active);
        assert_eq!(p.message_count, 1);
    }

    #[test]
    fn test_expertise_is_clamped() {
        let p = make_participant().with_expertise("async", 1.5);
        assert_eq!(p.expertise["async"], 1.0);
    }
}
