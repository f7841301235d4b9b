//! Context-aware selection: weighted scoring of topic relevance, declared
//! expertise, and engagement recency

use super::round_robin::{self, RoundRobinConfig};
use super::{best_expertise, topic_tokens};
use crate::discussion::entities::Discussion;
use crate::discussion::participant::Participant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weights and threshold for context-aware scoring
///
/// The defaults are starting points, not tuned values; they are meant to be
/// overridden per discussion once real usage data exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAwareConfig {
    pub relevance_weight: f64,
    pub expertise_weight: f64,
    pub engagement_weight: f64,
    /// Minimum combined score required to win over the round-robin fallback
    pub relevance_threshold: f64,
}

impl Default for ContextAwareConfig {
    fn default() -> Self {
        Self {
            relevance_weight: 0.5,
            expertise_weight: 0.3,
            engagement_weight: 0.2,
            relevance_threshold: 0.7,
        }
    }
}

/// Highest-scoring active participant above the threshold, else round-robin
pub(super) fn next_participant<'a>(
    config: &ContextAwareConfig,
    discussion: &Discussion,
    participants: &'a [Participant],
    now: DateTime<Utc>,
) -> Option<&'a Participant> {
    let tokens = topic_tokens(&discussion.topic);

    let mut best: Option<(f64, &Participant)> = None;
    for candidate in round_robin::sorted_roster(participants) {
        if !candidate.is_active {
            continue;
        }
        let candidate_score = score(config, candidate, &tokens, now);
        if best.is_none_or(|(best_score, _)| candidate_score > best_score) {
            best = Some((candidate_score, candidate));
        }
    }

    match best {
        Some((winner_score, winner)) if winner_score >= config.relevance_threshold => Some(winner),
        _ => round_robin::next_participant(&RoundRobinConfig::default(), discussion, participants),
    }
}

fn score(
    config: &ContextAwareConfig,
    participant: &Participant,
    tokens: &[String],
    now: DateTime<Utc>,
) -> f64 {
    config.relevance_weight * topic_relevance(participant, tokens)
        + config.expertise_weight * best_expertise(participant, tokens)
        + config.engagement_weight * engagement_recency(participant, now)
}

/// Fraction of topic tokens covered by the participant's declared areas
fn topic_relevance(participant: &Participant, tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens
        .iter()
        .filter(|token| participant.expertise.contains_key(*token))
        .count();
    matched as f64 / tokens.len() as f64
}

/// Decays from 1.0 with hours since the participant last contributed
fn engagement_recency(participant: &Participant, now: DateTime<Utc>) -> f64 {
    let hours = (now - participant.last_active_at).num_seconds().max(0) as f64 / 3600.0;
    1.0 / (1.0 + hours)
}
