//! Process-wide engine facade
//!
//! Constructed once by the process supervisor and passed by handle —
//! explicit dependency injection, no lazy statics. The engine owns the
//! actor registry: one actor task per live discussion, spawned lazily on
//! the first command for a discussion id and loaded through the store
//! port. Discussions are fully independent units of concurrency; no
//! cross-discussion locking exists anywhere.

mod actor;
mod command;

use crate::broadcast::EventBroadcaster;
use crate::engine::actor::DiscussionActor;
use crate::engine::command::{ActorCommand, Reply};
use crate::error::EngineError;
use crate::ports::discussion_store::{DiscussionStore, StoreError};
use crate::ports::event_audit::EventAuditLogger;
use crate::use_cases::lifecycle::{CreateDiscussionInput, LifecycleManager, ParticipantSpec};
use chrono::Utc;
use parley_domain::{
    ConnectionId, Discussion, DiscussionEvent, DiscussionId, DomainError, Participant,
    ParticipantId, PrincipalId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Engine-level tuning independent of per-discussion settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum active participants required by `start`
    pub min_participants_to_start: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_participants_to_start: 2,
        }
    }
}

/// The discussion turn orchestration engine
///
/// The command surface takes a discussion id plus the caller's principal
/// and returns success or a typed error; it is protocol-agnostic and is
/// shared verbatim by the inbound bridge, so bus-driven commands cannot
/// bypass validation.
pub struct DiscussionEngine {
    store: Arc<dyn DiscussionStore>,
    broadcaster: Arc<EventBroadcaster>,
    audit: Arc<dyn EventAuditLogger>,
    outbound: mpsc::UnboundedSender<DiscussionEvent>,
    lifecycle: LifecycleManager,
    actors: Mutex<HashMap<DiscussionId, mpsc::UnboundedSender<ActorCommand>>>,
    shutdown: CancellationToken,
}

impl DiscussionEngine {
    pub fn new(
        store: Arc<dyn DiscussionStore>,
        broadcaster: Arc<EventBroadcaster>,
        outbound: mpsc::UnboundedSender<DiscussionEvent>,
        audit: Arc<dyn EventAuditLogger>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            audit,
            outbound,
            lifecycle: LifecycleManager::new(config.min_participants_to_start),
            actors: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// Subscribe a live connection to a discussion's events
    pub fn join_room(&self, connection_id: ConnectionId, discussion_id: &DiscussionId) {
        self.broadcaster.join_room(connection_id, discussion_id);
    }

    /// Unsubscribe a live connection
    pub fn leave_room(&self, connection_id: &ConnectionId, discussion_id: &DiscussionId) {
        self.broadcaster.leave_room(connection_id, discussion_id);
    }

    /// Allocate a new discussion in `Draft`
    pub async fn create(&self, input: CreateDiscussionInput) -> Result<Discussion, EngineError> {
        let (mut discussion, participants) = self.lifecycle.create(input, Utc::now())?;
        let version = self.store.save_discussion(&discussion).await?;
        discussion.version = version;
        for participant in &participants {
            self.store.save_participant(participant).await?;
        }
        Ok(discussion)
    }

    pub async fn start(
        &self,
        id: &DiscussionId,
        started_by: impl Into<PrincipalId>,
    ) -> Result<(), EngineError> {
        let started_by = started_by.into();
        self.command(id, move |reply| ActorCommand::Start { started_by, reply })
            .await
    }

    pub async fn pause(&self, id: &DiscussionId) -> Result<(), EngineError> {
        self.command(id, |reply| ActorCommand::Pause { reply }).await
    }

    pub async fn resume(&self, id: &DiscussionId) -> Result<(), EngineError> {
        self.command(id, |reply| ActorCommand::Resume { reply })
            .await
    }

    pub async fn end(
        &self,
        id: &DiscussionId,
        reason: impl Into<String>,
    ) -> Result<(), EngineError> {
        let reason = reason.into();
        let result = self
            .command(id, move |reply| ActorCommand::End { reason, reply })
            .await;
        if result.is_ok() {
            self.actors.lock().await.remove(id);
        }
        result
    }

    pub async fn add_participant(
        &self,
        id: &DiscussionId,
        spec: ParticipantSpec,
    ) -> Result<Participant, EngineError> {
        self.command(id, move |reply| ActorCommand::AddParticipant { spec, reply })
            .await
    }

    pub async fn remove_participant(
        &self,
        id: &DiscussionId,
        participant_id: ParticipantId,
    ) -> Result<(), EngineError> {
        self.command(id, move |reply| ActorCommand::RemoveParticipant {
            participant_id,
            reply,
        })
        .await
    }

    pub async fn send_message(
        &self,
        id: &DiscussionId,
        sender: impl Into<PrincipalId>,
        content: impl Into<String>,
    ) -> Result<(), EngineError> {
        let sender = sender.into();
        let content = content.into();
        self.command(id, move |reply| ActorCommand::SendMessage {
            sender,
            content,
            reply,
        })
        .await
    }

    pub async fn advance_turn(
        &self,
        id: &DiscussionId,
        requested_by: impl Into<PrincipalId>,
        target: Option<ParticipantId>,
    ) -> Result<(), EngineError> {
        let requested_by = requested_by.into();
        self.command(id, move |reply| ActorCommand::AdvanceTurn {
            requested_by,
            target,
            reply,
        })
        .await
    }

    /// Cancel every actor and refuse further commands
    pub async fn shutdown(&self) {
        info!("Engine shutting down");
        self.shutdown.cancel();
        self.actors.lock().await.clear();
    }

    async fn command<T>(
        &self,
        id: &DiscussionId,
        make: impl FnOnce(Reply<T>) -> ActorCommand,
    ) -> Result<T, EngineError> {
        if self.shutdown.is_cancelled() {
            return Err(EngineError::Shutdown);
        }
        let tx = self.actor_sender(id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        if let Err(unsent) = tx.send(make(reply_tx)) {
            // The actor stopped between lookup and send: the discussion
            // ended. Reap the stale handle and reject like any other
            // command against a terminal discussion.
            self.actors.lock().await.remove(id);
            let phase = self
                .store
                .load_discussion(id)
                .await
                .map(|d| d.phase)
                .unwrap_or(parley_domain::DiscussionPhase::Ended);
            return Err(DomainError::InvalidStateTransition {
                phase,
                operation: unsent.0.name(),
            }
            .into());
        }
        reply_rx.await.map_err(|_| EngineError::Shutdown)?
    }

    /// Look up the live actor for a discussion, spawning one from stored
    /// state when none is running
    async fn actor_sender(
        &self,
        id: &DiscussionId,
    ) -> Result<mpsc::UnboundedSender<ActorCommand>, EngineError> {
        let mut actors = self.actors.lock().await;
        if let Some(tx) = actors.get(id)
            && !tx.is_closed()
        {
            return Ok(tx.clone());
        }

        let discussion = self.store.load_discussion(id).await.map_err(|e| match e {
            StoreError::NotFound => EngineError::NotFound(id.clone()),
            other => EngineError::Persistence(other),
        })?;
        if discussion.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "command",
            }
            .into());
        }
        let participants = self.store.load_participants(id).await?;

        debug!(discussion_id = %id, phase = %discussion.phase, "Spawning discussion actor");
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = DiscussionActor::new(
            discussion,
            participants,
            self.lifecycle.clone(),
            self.store.clone(),
            self.broadcaster.clone(),
            self.outbound.clone(),
            self.audit.clone(),
            rx,
            self.shutdown.child_token(),
        );
        tokio::spawn(actor.run());
        actors.insert(id.clone(), tx.clone());
        Ok(tx)
    }
}
