//! Turn-taking strategies
//!
//! The strategy set is fixed, so [`TurnStrategy`] is a closed tagged union:
//! each variant carries its own config payload and a `match` over the tag
//! selects behavior, keeping exhaustiveness checked at compile time.
//!
//! All selection logic here is pure. Strategies never mutate the
//! discussion; the scheduler applies their decisions inside the
//! per-discussion serialization domain.

mod context_aware;
mod expertise;
mod free_form;
mod moderated;
mod round_robin;

pub use context_aware::ContextAwareConfig;
pub use expertise::ExpertiseDrivenConfig;
pub use free_form::FreeFormConfig;
pub use round_robin::RoundRobinConfig;

use crate::discussion::entities::{Discussion, DiscussionPhase};
use crate::discussion::participant::Participant;
use crate::turn::record::TurnHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Historical response times are clamped to this window before they replace
/// the configured base budget.
const MIN_HISTORICAL_SECS: f64 = 30.0;
const MAX_HISTORICAL_SECS: f64 = 1800.0;

/// Topics longer than this get a 20% budget bump.
const LONG_TOPIC_CHARS: usize = 200;
const LONG_TOPIC_FACTOR: f64 = 1.2;

/// The turn-taking policy of a discussion
///
/// Tuning values (weights, thresholds, cooldowns) are serde defaults on the
/// per-variant payloads, so they are configurable per discussion rather
/// than load-bearing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TurnStrategy {
    /// Join-order rotation
    RoundRobin(RoundRobinConfig),
    /// Weighted scoring of relevance, expertise, and engagement
    ContextAware(ContextAwareConfig),
    /// Highest declared expertise for the topic wins
    ExpertiseDriven(ExpertiseDrivenConfig),
    /// Every advance is an explicit moderator decision
    Moderated,
    /// No enforced order, per-participant cooldown against monopolization
    FreeForm(FreeFormConfig),
}

impl Default for TurnStrategy {
    fn default() -> Self {
        TurnStrategy::RoundRobin(RoundRobinConfig::default())
    }
}

impl TurnStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            TurnStrategy::RoundRobin(_) => "round-robin",
            TurnStrategy::ContextAware(_) => "context-aware",
            TurnStrategy::ExpertiseDriven(_) => "expertise-driven",
            TurnStrategy::Moderated => "moderated",
            TurnStrategy::FreeForm(_) => "free-form",
        }
    }

    /// Decide the next speaker.
    ///
    /// Fails soft: `None` means no eligible participant exists right now and
    /// the caller must not advance the turn.
    pub fn next_participant<'a>(
        &self,
        discussion: &Discussion,
        participants: &'a [Participant],
        history: &TurnHistory,
        now: DateTime<Utc>,
    ) -> Option<&'a Participant> {
        match self {
            TurnStrategy::RoundRobin(config) => {
                round_robin::next_participant(config, discussion, participants)
            }
            TurnStrategy::ContextAware(config) => {
                context_aware::next_participant(config, discussion, participants, now)
            }
            TurnStrategy::ExpertiseDriven(config) => {
                expertise::next_participant(config, discussion, participants)
            }
            TurnStrategy::Moderated => moderated::next_participant(),
            TurnStrategy::FreeForm(config) => {
                free_form::next_participant(config, participants, history, now)
            }
        }
    }

    /// Whether the participant may hold a turn right now
    pub fn can_participant_take_turn(
        &self,
        participant: &Participant,
        discussion: &Discussion,
        history: &TurnHistory,
        now: DateTime<Utc>,
    ) -> bool {
        if !participant.is_active || participant.discussion_id != discussion.id {
            return false;
        }
        match self {
            TurnStrategy::RoundRobin(_)
            | TurnStrategy::ContextAware(_)
            | TurnStrategy::ExpertiseDriven(_) => true,
            TurnStrategy::Moderated => moderated::can_take_turn(participant, discussion),
            TurnStrategy::FreeForm(config) => {
                free_form::is_off_cooldown(config, participant, history, now)
            }
        }
    }

    /// Whether an elapsed time budget may advance the turn at all
    ///
    /// `Moderated` never auto-advances; every other variant does.
    pub fn auto_advance_on_timeout(&self) -> bool {
        !matches!(self, TurnStrategy::Moderated)
    }

    /// Whether the current turn should advance now
    pub fn should_advance_turn(&self, discussion: &Discussion, now: DateTime<Utc>) -> bool {
        if !self.auto_advance_on_timeout() {
            return false;
        }
        discussion.phase == DiscussionPhase::Active
            && discussion
                .current_turn
                .expected_end_at
                .is_some_and(|end| now >= end)
    }

    /// Estimate how long the participant's turn should run.
    ///
    /// The base budget comes from the settings; an observed historical mean
    /// response time replaces it (clamped to [30s, 1800s]); long topics get
    /// a 20% bump; a declared response-delay preference is added on top.
    pub fn estimated_turn_duration(
        &self,
        participant: &Participant,
        discussion: &Discussion,
        history: &TurnHistory,
    ) -> Duration {
        let mut secs = discussion.settings.turn_timeout_seconds as f64;
        if let Some(mean) = history.mean_response_seconds(&participant.id) {
            secs = mean.clamp(MIN_HISTORICAL_SECS, MAX_HISTORICAL_SECS);
        }
        if discussion.topic.chars().count() > LONG_TOPIC_CHARS {
            secs *= LONG_TOPIC_FACTOR;
        }
        if let Some(delay) = participant.preferences.response_delay_seconds {
            secs += delay as f64;
        }
        Duration::from_secs(secs.round() as u64)
    }
}

/// Lowercased alphanumeric topic words of three or more characters
pub(crate) fn topic_tokens(topic: &str) -> Vec<String> {
    topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Best declared expertise score among the topic tokens
pub(crate) fn best_expertise(participant: &Participant, topic_tokens: &[String]) -> f64 {
    topic_tokens
        .iter()
        .filter_map(|token| participant.expertise.get(token))
        .fold(0.0_f64, |best, score| best.max(*score))
}
