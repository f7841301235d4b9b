//! Turn scheduling
//!
//! The scheduler exclusively owns `current_turn` mutation. It is pure
//! decision-and-mutation logic over a draft copy of the aggregate; the
//! actor owns persistence ordering, event emission, and the actual timer.

use chrono::{DateTime, Utc};
use parley_domain::{
    CurrentTurn, Discussion, DiscussionPhase, DomainError, Participant, ParticipantId,
    TurnEndReason, TurnHistory, TurnRecord,
};
use std::time::Duration;
use tracing::debug;

/// Result of advancing a turn
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// A new speaker was assigned
    Advanced {
        /// The completed turn, if one was in flight
        record: Option<TurnRecord>,
        participant_id: ParticipantId,
        /// Time budget for the new turn; also the timer duration
        estimated: Duration,
    },
    /// `max_turns` is exhausted; the caller must end the discussion
    LimitReached { record: Option<TurnRecord> },
}

/// Owner of `current_turn` mutation
#[derive(Debug, Clone, Default)]
pub struct TurnScheduler;

impl TurnScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Advance to the next turn.
    ///
    /// `target` is an explicit speaker choice (a moderator decision); when
    /// absent the strategy decides. Fails with `NoEligibleParticipant`
    /// without touching `current_turn` when no speaker is available — the
    /// discussion stays on its prior turn until corrected.
    pub fn advance(
        &self,
        discussion: &mut Discussion,
        participants: &[Participant],
        history: &TurnHistory,
        reason: TurnEndReason,
        target: Option<&ParticipantId>,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, DomainError> {
        if discussion.phase != DiscussionPhase::Active {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "advance_turn",
            });
        }

        let record = self.completed_record(discussion, reason, now);

        if let Some(max_turns) = discussion.settings.max_turns
            && discussion.current_turn.turn_number >= max_turns
        {
            debug!(
                discussion_id = %discussion.id,
                max_turns,
                "Turn limit reached"
            );
            return Ok(TurnOutcome::LimitReached { record });
        }

        let strategy = &discussion.settings.strategy;
        let next = match target {
            Some(id) => {
                let participant = participants
                    .iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| {
                        DomainError::Validation(format!("unknown participant '{id}'"))
                    })?;
                if !participant.is_active {
                    return Err(DomainError::Validation(format!(
                        "participant '{id}' is not active"
                    )));
                }
                participant
            }
            None => strategy
                .next_participant(discussion, participants, history, now)
                .ok_or(DomainError::NoEligibleParticipant)?,
        };

        let estimated = strategy.estimated_turn_duration(next, discussion, history);
        let turn_number = discussion.current_turn.turn_number + 1;
        debug!(
            discussion_id = %discussion.id,
            turn_number,
            participant_id = %next.id,
            strategy = strategy.name(),
            "Turn assigned"
        );

        discussion.current_turn = CurrentTurn {
            turn_number,
            participant_id: Some(next.id.clone()),
            started_at: Some(now),
            expected_end_at: Some(now + chrono::Duration::seconds(estimated.as_secs() as i64)),
        };

        Ok(TurnOutcome::Advanced {
            record,
            participant_id: next.id.clone(),
            estimated,
        })
    }

    /// Build the record for the turn currently in flight, if any
    pub fn completed_record(
        &self,
        discussion: &Discussion,
        reason: TurnEndReason,
        now: DateTime<Utc>,
    ) -> Option<TurnRecord> {
        let participant_id = discussion.current_turn.participant_id.clone()?;
        Some(TurnRecord {
            discussion_id: discussion.id.clone(),
            turn_number: discussion.current_turn.turn_number,
            participant_id,
            started_at: discussion.current_turn.started_at.unwrap_or(now),
            ended_at: now,
            reason,
        })
    }

    /// Freeze the remaining turn budget when pausing.
    ///
    /// The budget is preserved, not reset: resume re-arms with exactly what
    /// was left.
    pub fn freeze_deadline(&self, discussion: &mut Discussion, now: DateTime<Utc>) -> Option<Duration> {
        let end = discussion.current_turn.expected_end_at.take()?;
        Some((end - now).to_std().unwrap_or_default())
    }

    /// Restore a frozen budget on resume
    pub fn restore_deadline(
        &self,
        discussion: &mut Discussion,
        remaining: Duration,
        now: DateTime<Utc>,
    ) {
        if discussion.current_turn.is_assigned() {
            discussion.current_turn.expected_end_at =
                Some(now + chrono::Duration::milliseconds(remaining.as_millis() as i64));
        }
    }
}
