//! Free-form selection: anyone active may speak, subject to a cooldown

use crate::discussion::participant::Participant;
use crate::turn::record::TurnHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFormConfig {
    /// Seconds a participant must wait after finishing a turn before
    /// holding the floor again
    pub cooldown_seconds: u64,
}

impl Default for FreeFormConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 5,
        }
    }
}

/// Whether the participant's cooldown since their last turn has elapsed
pub(super) fn is_off_cooldown(
    config: &FreeFormConfig,
    participant: &Participant,
    history: &TurnHistory,
    now: DateTime<Utc>,
) -> bool {
    match history.last_turn_end_for(&participant.id) {
        None => true,
        Some(end) => now - end >= chrono::Duration::seconds(config.cooldown_seconds as i64),
    }
}

/// Among eligible participants, the one who has gone longest without a turn
/// (never-spoken first, by join order)
pub(super) fn next_participant<'a>(
    config: &FreeFormConfig,
    participants: &'a [Participant],
    history: &TurnHistory,
    now: DateTime<Utc>,
) -> Option<&'a Participant> {
    participants
        .iter()
        .filter(|p| p.is_active && is_off_cooldown(config, p, history, now))
        .min_by_key(|p| {
            (
                history.last_turn_end_for(&p.id),
                p.joined_at,
                p.id.clone(),
            )
        })
}
