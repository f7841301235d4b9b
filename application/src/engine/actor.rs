//! Per-discussion actor
//!
//! One actor task is the serialization domain for one discussion: commands
//! are consumed sequentially and the turn deadline is an arm of the same
//! `select!` loop, so the critical section (validate phase -> strategy
//! decision -> persist -> emit) needs no locks. The deadline is tagged with
//! the turn number it was armed for; when a timer fire and an explicit
//! advance race, the loser sees a different current turn number and is a
//! no-op.
//!
//! Mutations go through a draft copy of the aggregate that is committed to
//! actor state only after the durable writes succeed, so a persistence
//! failure leaves no partial in-memory mutation and broadcasts nothing.

use crate::broadcast::EventBroadcaster;
use crate::engine::command::ActorCommand;
use crate::error::EngineError;
use crate::ports::discussion_store::DiscussionStore;
use crate::ports::event_audit::EventAuditLogger;
use crate::use_cases::lifecycle::{LifecycleManager, ParticipantSpec};
use crate::use_cases::scheduler::{TurnOutcome, TurnScheduler};
use chrono::Utc;
use parley_domain::event::NO_ELIGIBLE_PARTICIPANT;
use parley_domain::{
    Discussion, DiscussionEvent, DiscussionEventKind, DiscussionPhase, DomainError, Message,
    Participant, ParticipantId, PrincipalId, TurnEndReason, TurnHistory, TurnStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A turn deadline armed for a specific turn number
#[derive(Debug, Clone, Copy)]
struct TurnDeadline {
    turn_number: u64,
    at: Instant,
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

pub(crate) struct DiscussionActor {
    discussion: Discussion,
    participants: Vec<Participant>,
    history: TurnHistory,
    lifecycle: LifecycleManager,
    scheduler: TurnScheduler,
    store: Arc<dyn DiscussionStore>,
    broadcaster: Arc<EventBroadcaster>,
    outbound: mpsc::UnboundedSender<DiscussionEvent>,
    audit: Arc<dyn EventAuditLogger>,
    deadline: Option<TurnDeadline>,
    /// Remaining turn budget captured on pause, restored on resume
    frozen_budget: Option<Duration>,
    rx: mpsc::UnboundedReceiver<ActorCommand>,
    shutdown: CancellationToken,
}

impl DiscussionActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        discussion: Discussion,
        participants: Vec<Participant>,
        lifecycle: LifecycleManager,
        store: Arc<dyn DiscussionStore>,
        broadcaster: Arc<EventBroadcaster>,
        outbound: mpsc::UnboundedSender<DiscussionEvent>,
        audit: Arc<dyn EventAuditLogger>,
        rx: mpsc::UnboundedReceiver<ActorCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        // Resume timeout accounting for a discussion loaded mid-turn
        let deadline = match (discussion.phase, discussion.current_turn.expected_end_at) {
            (DiscussionPhase::Active, Some(end))
                if discussion.settings.strategy.auto_advance_on_timeout() =>
            {
                let remaining = (end - Utc::now()).to_std().unwrap_or_default();
                Some(TurnDeadline {
                    turn_number: discussion.current_turn.turn_number,
                    at: Instant::now() + remaining,
                })
            }
            _ => None,
        };

        Self {
            discussion,
            participants,
            history: TurnHistory::new(),
            lifecycle,
            scheduler: TurnScheduler::new(),
            store,
            broadcaster,
            outbound,
            audit,
            deadline,
            frozen_budget: None,
            rx,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(discussion_id = %self.discussion.id, "Discussion actor started");
        loop {
            let deadline = self.deadline;
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.rx.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle(command).await == Flow::Stop {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                armed_turn = Self::wait_deadline(deadline) => {
                    self.on_deadline(armed_turn).await;
                    if self.discussion.is_terminal() {
                        break;
                    }
                }
            }
        }
        debug!(discussion_id = %self.discussion.id, "Discussion actor stopped");
    }

    /// Sleep until the armed deadline, or forever when no timer is armed
    async fn wait_deadline(deadline: Option<TurnDeadline>) -> u64 {
        match deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline.at).await;
                deadline.turn_number
            }
            None => futures::future::pending().await,
        }
    }

    async fn handle(&mut self, command: ActorCommand) -> Flow {
        match command {
            ActorCommand::Start { started_by, reply } => {
                let _ = reply.send(self.handle_start(started_by).await);
            }
            ActorCommand::Pause { reply } => {
                let _ = reply.send(self.handle_pause().await);
            }
            ActorCommand::Resume { reply } => {
                let _ = reply.send(self.handle_resume().await);
            }
            ActorCommand::End { reason, reply } => {
                let _ = reply.send(self.handle_end(reason).await);
            }
            ActorCommand::AddParticipant { spec, reply } => {
                let _ = reply.send(self.handle_add_participant(spec).await);
            }
            ActorCommand::RemoveParticipant {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.handle_remove_participant(participant_id).await);
            }
            ActorCommand::SendMessage {
                sender,
                content,
                reply,
            } => {
                let _ = reply.send(self.handle_send_message(sender, content).await);
            }
            ActorCommand::AdvanceTurn {
                requested_by,
                target,
                reply,
            } => {
                let _ = reply.send(self.handle_advance_turn(requested_by, target).await);
            }
        }
        if self.discussion.is_terminal() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// The armed deadline elapsed. The timer fire re-enters this actor's
    /// queue position, so state may have moved since arming: a stale turn
    /// number means an explicit advance won the race and this fire is a
    /// no-op.
    async fn on_deadline(&mut self, armed_turn: u64) {
        self.deadline = None;
        if self.discussion.phase != DiscussionPhase::Active
            || self.discussion.current_turn.turn_number != armed_turn
        {
            debug!(
                discussion_id = %self.discussion.id,
                armed_turn,
                current_turn = self.discussion.current_turn.turn_number,
                "Stale turn deadline ignored"
            );
            return;
        }
        // The deadline is only ever armed for strategies that allow it, so
        // the elapsed budget itself is the advance condition here.
        if !self.discussion.settings.strategy.auto_advance_on_timeout() {
            return;
        }
        info!(
            discussion_id = %self.discussion.id,
            turn_number = armed_turn,
            "Turn timed out"
        );
        if let Err(error) = self.advance_turn(TurnEndReason::Timeout, None).await {
            warn!(
                discussion_id = %self.discussion.id,
                %error,
                "Timeout advance failed"
            );
        }
    }

    async fn handle_start(&mut self, started_by: PrincipalId) -> Result<(), EngineError> {
        let mut draft = self.discussion.clone();
        self.lifecycle.start(&mut draft, &self.participants)?;
        self.persist(&mut draft).await?;
        self.discussion = draft;
        self.emit(DiscussionEventKind::DiscussionStarted { started_by });
        // A moderated discussion waits for an explicit moderator decision;
        // everything else gets its first speaker immediately. An empty
        // strategy result is surfaced as an error event, not a command
        // failure.
        if self.discussion.settings.strategy != TurnStrategy::Moderated {
            self.advance_turn(TurnEndReason::Explicit, None).await?;
        }
        Ok(())
    }

    async fn handle_pause(&mut self) -> Result<(), EngineError> {
        let now = Utc::now();
        let mut draft = self.discussion.clone();
        self.lifecycle.pause(&mut draft)?;
        let frozen = self.scheduler.freeze_deadline(&mut draft, now);
        self.persist(&mut draft).await?;
        self.discussion = draft;
        self.frozen_budget = frozen;
        self.deadline = None;
        self.emit(DiscussionEventKind::DiscussionPaused);
        Ok(())
    }

    async fn handle_resume(&mut self) -> Result<(), EngineError> {
        let now = Utc::now();
        let mut draft = self.discussion.clone();
        self.lifecycle.resume(&mut draft)?;
        if let Some(remaining) = self.frozen_budget {
            self.scheduler.restore_deadline(&mut draft, remaining, now);
        }
        self.persist(&mut draft).await?;
        self.discussion = draft;
        if let Some(remaining) = self.frozen_budget.take()
            && self.discussion.current_turn.is_assigned()
            && self.discussion.settings.strategy.auto_advance_on_timeout()
        {
            self.deadline = Some(TurnDeadline {
                turn_number: self.discussion.current_turn.turn_number,
                at: Instant::now() + remaining,
            });
        }
        self.emit(DiscussionEventKind::DiscussionResumed);

        // The frozen speaker may have been removed while paused
        if self.turn_is_stalled()
            && let Err(error) = self.advance_turn(TurnEndReason::Skipped, None).await
        {
            warn!(
                discussion_id = %self.discussion.id,
                %error,
                "Post-resume turn recovery failed"
            );
        }
        Ok(())
    }

    async fn handle_end(&mut self, reason: String) -> Result<(), EngineError> {
        let now = Utc::now();
        let mut draft = self.discussion.clone();
        self.lifecycle.end(&mut draft)?;
        // Flush the in-flight turn before finalizing
        let record = self
            .scheduler
            .completed_record(&self.discussion, TurnEndReason::Explicit, now);
        if let Some(record) = &record {
            self.store.append_turn_record(record).await?;
        }
        self.persist(&mut draft).await?;
        if let Some(record) = record {
            self.history.push(record);
        }
        self.discussion = draft;
        self.deadline = None;
        self.frozen_budget = None;
        self.emit(DiscussionEventKind::DiscussionEnded { reason });
        Ok(())
    }

    async fn handle_add_participant(
        &mut self,
        spec: ParticipantSpec,
    ) -> Result<Participant, EngineError> {
        let participant =
            self.lifecycle
                .add_participant(&self.discussion, &self.participants, spec, Utc::now())?;
        self.store.save_participant(&participant).await?;
        self.participants.push(participant.clone());
        self.emit(DiscussionEventKind::ParticipantJoined {
            participant_id: participant.id.clone(),
            principal_id: participant.principal_id.clone(),
            role: participant.role,
        });

        // A turn frozen on no-eligible-participant self-heals here
        if self.turn_is_stalled()
            && let Err(error) = self.advance_turn(TurnEndReason::Skipped, None).await
        {
            warn!(
                discussion_id = %self.discussion.id,
                %error,
                "Post-join turn recovery failed"
            );
        }
        Ok(participant)
    }

    async fn handle_remove_participant(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(), EngineError> {
        self.lifecycle
            .ensure_roster_mutable(&self.discussion, "remove_participant")?;
        let index = self
            .participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or_else(|| {
                DomainError::Validation(format!("unknown participant '{participant_id}'"))
            })?;
        if !self.participants[index].is_active {
            return Err(DomainError::Validation(format!(
                "participant '{participant_id}' has already left"
            ))
            .into());
        }

        let mut updated = self.participants[index].clone();
        updated.deactivate();
        self.store.save_participant(&updated).await?;
        self.participants[index] = updated;

        let was_current = self.discussion.is_current_speaker(&participant_id);
        self.emit(DiscussionEventKind::ParticipantLeft { participant_id });

        // Removing the current speaker forces an immediate advance
        if was_current && self.discussion.phase == DiscussionPhase::Active {
            self.advance_turn(TurnEndReason::Skipped, None).await?;
        }
        Ok(())
    }

    async fn handle_send_message(
        &mut self,
        sender: PrincipalId,
        content: String,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        if self.discussion.phase != DiscussionPhase::Active {
            return Err(DomainError::InvalidStateTransition {
                phase: self.discussion.phase,
                operation: "send_message",
            }
            .into());
        }
        let index = self
            .participants
            .iter()
            .position(|p| p.principal_id == sender && p.is_active)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "principal '{sender}' is not an active participant"
                ))
            })?;

        let may_speak = match &self.discussion.settings.strategy {
            // Free-form lets any active participant speak, cooldown permitting
            TurnStrategy::FreeForm(_) => self.discussion.settings.strategy.can_participant_take_turn(
                &self.participants[index],
                &self.discussion,
                &self.history,
                now,
            ),
            _ => self.discussion.is_current_speaker(&self.participants[index].id),
        };
        if !may_speak {
            return Err(DomainError::Validation(format!(
                "participant '{}' does not hold the turn",
                self.participants[index].id
            ))
            .into());
        }

        let mut updated = self.participants[index].clone();
        updated.record_message(now);
        self.store.save_participant(&updated).await?;
        let participant_id = updated.id.clone();
        self.participants[index] = updated;

        self.emit(DiscussionEventKind::MessageReceived {
            message: Message::new(participant_id, content, now),
        });
        Ok(())
    }

    async fn handle_advance_turn(
        &mut self,
        requested_by: PrincipalId,
        target: Option<ParticipantId>,
    ) -> Result<(), EngineError> {
        let requester = self
            .participants
            .iter()
            .find(|p| p.principal_id == requested_by && p.is_active)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "principal '{requested_by}' is not an active participant"
                ))
            })?;

        if target.is_some() && !requester.is_moderator() {
            return Err(DomainError::Validation(
                "only a moderator may choose the next speaker".into(),
            )
            .into());
        }

        let reason = if self.discussion.is_current_speaker(&requester.id) {
            TurnEndReason::Explicit
        } else if requester.is_moderator() {
            TurnEndReason::ModeratorOverride
        } else {
            return Err(DomainError::Validation(
                "only the current speaker or a moderator may advance the turn".into(),
            )
            .into());
        };

        self.advance_turn(reason, target.as_ref()).await
    }

    /// Shared advance path for timer fires, explicit advances, and forced
    /// skips.
    async fn advance_turn(
        &mut self,
        reason: TurnEndReason,
        target: Option<&ParticipantId>,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        let mut draft = self.discussion.clone();
        let outcome = self.scheduler.advance(
            &mut draft,
            &self.participants,
            &self.history,
            reason,
            target,
            now,
        );

        match outcome {
            Err(DomainError::NoEligibleParticipant) => {
                warn!(
                    discussion_id = %self.discussion.id,
                    turn_number = self.discussion.current_turn.turn_number,
                    "No eligible participant; turn frozen"
                );
                self.deadline = None;
                self.emit(DiscussionEventKind::Error {
                    code: NO_ELIGIBLE_PARTICIPANT.into(),
                    message: "no active participant is eligible for the next turn".into(),
                });
                Ok(())
            }
            Err(error) => Err(error.into()),
            Ok(TurnOutcome::Advanced {
                record,
                participant_id,
                estimated,
            }) => {
                if let Some(record) = &record {
                    self.store.append_turn_record(record).await?;
                }
                self.persist(&mut draft).await?;
                let previous_turn_reason = record.as_ref().map(|r| r.reason);
                if let Some(record) = record {
                    self.history.push(record);
                }
                self.discussion = draft;

                self.deadline = self
                    .discussion
                    .settings
                    .strategy
                    .auto_advance_on_timeout()
                    .then(|| TurnDeadline {
                        turn_number: self.discussion.current_turn.turn_number,
                        at: Instant::now() + estimated,
                    });

                self.emit(DiscussionEventKind::TurnChanged {
                    participant_id,
                    expected_end_at: self.discussion.current_turn.expected_end_at,
                    previous_turn_reason,
                });
                Ok(())
            }
            Ok(TurnOutcome::LimitReached { record }) => {
                if let Some(record) = &record {
                    self.store.append_turn_record(record).await?;
                }
                let mut draft = self.discussion.clone();
                self.lifecycle.end(&mut draft)?;
                self.persist(&mut draft).await?;
                if let Some(record) = record {
                    self.history.push(record);
                }
                self.discussion = draft;
                self.deadline = None;
                self.emit(DiscussionEventKind::DiscussionEnded {
                    reason: "max-turns-reached".into(),
                });
                Ok(())
            }
        }
    }

    /// An active discussion whose current speaker is missing or inactive.
    ///
    /// A moderated discussion between assignments is waiting, not stalled.
    fn turn_is_stalled(&self) -> bool {
        if self.discussion.phase != DiscussionPhase::Active
            || self.discussion.settings.strategy == TurnStrategy::Moderated
        {
            return false;
        }
        match &self.discussion.current_turn.participant_id {
            Some(id) => !self
                .participants
                .iter()
                .any(|p| &p.id == id && p.is_active),
            None => true,
        }
    }

    /// Persist the draft aggregate; committing it to actor state is the
    /// caller's move once every durable write has succeeded.
    async fn persist(&self, draft: &mut Discussion) -> Result<(), EngineError> {
        let version = self.store.save_discussion(draft).await?;
        draft.version = version;
        Ok(())
    }

    /// Deliver an event: audit trail, room fan-out, and the bridge's
    /// outbound queue. All three are non-blocking; durable writes already
    /// happened.
    fn emit(&self, kind: DiscussionEventKind) {
        let event = DiscussionEvent::new(
            self.discussion.id.clone(),
            self.discussion.current_turn.turn_number,
            kind,
        );
        self.audit.log(&event);
        self.broadcaster.broadcast(&event);
        if self.outbound.send(event).is_err() {
            warn!(
                discussion_id = %self.discussion.id,
                "Bridge outbound queue is closed; event not published to bus"
            );
        }
    }
}
