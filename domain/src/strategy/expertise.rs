//! Expertise-driven selection

use super::round_robin::{self, RoundRobinConfig};
use super::{best_expertise, topic_tokens};
use crate::discussion::entities::Discussion;
use crate::discussion::participant::Participant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertiseDrivenConfig {
    /// Minimum declared expertise for the topic required to qualify
    pub expertise_threshold: f64,
    /// Fall back to round-robin instead of stalling when nobody qualifies
    pub fallback_to_round_robin: bool,
}

impl Default for ExpertiseDrivenConfig {
    fn default() -> Self {
        Self {
            expertise_threshold: 0.8,
            fallback_to_round_robin: false,
        }
    }
}

/// Best qualified expert for the topic; otherwise round-robin when the
/// fallback flag is set, else `None` and the turn stalls.
pub(super) fn next_participant<'a>(
    config: &ExpertiseDrivenConfig,
    discussion: &Discussion,
    participants: &'a [Participant],
) -> Option<&'a Participant> {
    let tokens = topic_tokens(&discussion.topic);

    let mut best: Option<(f64, &Participant)> = None;
    for candidate in round_robin::sorted_roster(participants) {
        if !candidate.is_active {
            continue;
        }
        let candidate_score = best_expertise(candidate, &tokens);
        if best.is_none_or(|(best_score, _)| candidate_score > best_score) {
            best = Some((candidate_score, candidate));
        }
    }

    match best {
        Some((winner_score, winner)) if winner_score >= config.expertise_threshold => Some(winner),
        _ if config.fallback_to_round_robin => {
            round_robin::next_participant(&RoundRobinConfig::default(), discussion, participants)
        }
        _ => None,
    }
}
