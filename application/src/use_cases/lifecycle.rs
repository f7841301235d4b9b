//! Discussion lifecycle state machine
//!
//! The lifecycle manager exclusively owns phase transitions:
//!
//! ```text
//! Draft ──> Active <──> Paused
//!   │         │            │
//!   └─────────┴──> Ended <─┘
//! ```
//!
//! Every transition is validated against the current phase before any
//! mutation; illegal transitions are rejected, never silently coerced.

use chrono::{DateTime, Duration, Utc};
use parley_domain::{
    CurrentTurn, Discussion, DiscussionPhase, DiscussionSettings, DomainError, Participant,
    ParticipantPreferences, ParticipantRole, PrincipalId,
};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Declared member of a new or running discussion
#[derive(Debug, Clone)]
pub struct ParticipantSpec {
    pub principal_id: PrincipalId,
    pub role: ParticipantRole,
    pub expertise: BTreeMap<String, f64>,
    pub preferences: ParticipantPreferences,
}

impl ParticipantSpec {
    pub fn new(principal_id: impl Into<PrincipalId>, role: ParticipantRole) -> Self {
        Self {
            principal_id: principal_id.into(),
            role,
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

    fn materialize(&self, discussion: &Discussion, joined_at: DateTime<Utc>) -> Participant {
        let mut participant = Participant::new(
            Uuid::new_v4().to_string(),
            discussion.id.clone(),
            self.principal_id.clone(),
            self.role,
            joined_at,
        );
        participant.expertise = self.expertise.clone();
        participant.preferences = self.preferences.clone();
        participant
    }
}

/// Input for creating a discussion
#[derive(Debug, Clone)]
pub struct CreateDiscussionInput {
    pub topic: String,
    pub title: String,
    pub created_by: PrincipalId,
    pub settings: DiscussionSettings,
    pub initial_participants: Vec<ParticipantSpec>,
}

impl CreateDiscussionInput {
    pub fn new(
        topic: impl Into<String>,
        title: impl Into<String>,
        created_by: impl Into<PrincipalId>,
    ) -> Self {
        Self {
            topic: topic.into(),
            title: title.into(),
            created_by: created_by.into(),
            settings: DiscussionSettings::default(),
            initial_participants: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: DiscussionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_participant(mut self, spec: ParticipantSpec) -> Self {
        self.initial_participants.push(spec);
        self
    }
}

/// Owner of discussion phase transitions and roster membership rules
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    /// Minimum active participants required by `start` (single-party test
    /// scenarios lower this to 1)
    min_participants_to_start: usize,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self {
            min_participants_to_start: 2,
        }
    }
}

impl LifecycleManager {
    pub fn new(min_participants_to_start: usize) -> Self {
        Self {
            min_participants_to_start: min_participants_to_start.max(1),
        }
    }

    /// Allocate a new discussion in `Draft` with its initial roster.
    ///
    /// Rejected with `Validation` before any state exists.
    pub fn create(
        &self,
        input: CreateDiscussionInput,
        now: DateTime<Utc>,
    ) -> Result<(Discussion, Vec<Participant>), DomainError> {
        if input.topic.trim().is_empty() {
            return Err(DomainError::Validation("topic must not be empty".into()));
        }
        if input.initial_participants.is_empty() {
            return Err(DomainError::Validation(
                "at least one initial participant is required".into(),
            ));
        }
        input.settings.validate()?;
        if input.initial_participants.len() > input.settings.max_participants {
            return Err(DomainError::Validation(format!(
                "initial roster exceeds max_participants ({})",
                input.settings.max_participants
            )));
        }
        let mut principals: Vec<&PrincipalId> = input
            .initial_participants
            .iter()
            .map(|spec| &spec.principal_id)
            .collect();
        principals.sort();
        principals.dedup();
        if principals.len() != input.initial_participants.len() {
            return Err(DomainError::Validation(
                "duplicate principal in initial roster".into(),
            ));
        }

        let discussion = Discussion::new(
            Uuid::new_v4().to_string(),
            input.topic,
            input.title,
            input.created_by,
            input.settings,
            now,
        );
        // Join timestamps are nudged by the declared order so join-order
        // strategies see the roster exactly as it was specified.
        let participants: Vec<Participant> = input
            .initial_participants
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.materialize(&discussion, now + Duration::microseconds(i as i64))
            })
            .collect();

        info!(
            discussion_id = %discussion.id,
            participants = participants.len(),
            strategy = discussion.settings.strategy.name(),
            "Discussion created"
        );
        Ok((discussion, participants))
    }

    /// Transition `Draft -> Active`. The caller immediately triggers the
    /// scheduler's first turn assignment afterwards.
    pub fn start(
        &self,
        discussion: &mut Discussion,
        participants: &[Participant],
    ) -> Result<(), DomainError> {
        if discussion.phase != DiscussionPhase::Draft {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "start",
            });
        }
        let active = participants.iter().filter(|p| p.is_active).count();
        if active < self.min_participants_to_start {
            return Err(DomainError::Validation(format!(
                "starting requires at least {} active participants, found {}",
                self.min_participants_to_start, active
            )));
        }
        discussion.phase = DiscussionPhase::Active;
        discussion.current_turn = CurrentTurn::unassigned();
        info!(discussion_id = %discussion.id, "Discussion started");
        Ok(())
    }

    /// Transition `Active -> Paused`
    pub fn pause(&self, discussion: &mut Discussion) -> Result<(), DomainError> {
        if discussion.phase != DiscussionPhase::Active {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "pause",
            });
        }
        discussion.phase = DiscussionPhase::Paused;
        info!(discussion_id = %discussion.id, "Discussion paused");
        Ok(())
    }

    /// Transition `Paused -> Active`
    pub fn resume(&self, discussion: &mut Discussion) -> Result<(), DomainError> {
        if discussion.phase != DiscussionPhase::Paused {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "resume",
            });
        }
        discussion.phase = DiscussionPhase::Active;
        info!(discussion_id = %discussion.id, "Discussion resumed");
        Ok(())
    }

    /// Transition any non-terminal phase to `Ended`
    pub fn end(&self, discussion: &mut Discussion) -> Result<(), DomainError> {
        if discussion.phase.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                phase: discussion.phase,
                operation: "end",
            });
        }
        discussion.phase = DiscussionPhase::Ended;
        info!(discussion_id = %discussion.id, "Discussion ended");
        Ok(())
    }

    /// Roster changes are legal only while `Active` or `Paused`
    pub fn ensure_roster_mutable(
        &self,
        discussion: &Discussion,
        operation: &'static str,
    ) -> Result<(), DomainError> {
        match discussion.phase {
            DiscussionPhase::Active | DiscussionPhase::Paused => Ok(()),
            phase => Err(DomainError::InvalidStateTransition { phase, operation }),
        }
    }

    /// Validate and materialize a participant joining a running discussion
    pub fn add_participant(
        &self,
        discussion: &Discussion,
        roster: &[Participant],
        spec: ParticipantSpec,
        now: DateTime<Utc>,
    ) -> Result<Participant, DomainError> {
        self.ensure_roster_mutable(discussion, "add_participant")?;
        let active = roster.iter().filter(|p| p.is_active).count();
        if active >= discussion.settings.max_participants {
            return Err(DomainError::Validation(format!(
                "discussion is full ({} active participants)",
                active
            )));
        }
        if roster
            .iter()
            .any(|p| p.is_active && p.principal_id == spec.principal_id)
        {
            return Err(DomainError::Validation(format!(
                "principal '{}' is already an active participant",
                spec.principal_id
            )));
        }
        Ok(spec.materialize(discussion, now))
    }
}
