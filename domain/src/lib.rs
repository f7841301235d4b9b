//! Domain layer for parley
//!
//! This crate contains the core business logic, entities, and value objects
//! of the discussion turn orchestration engine. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Discussion
//!
//! A discussion is a bounded, multi-participant conversational session with
//! an explicit turn-taking policy. Its lifecycle is a small state machine:
//!
//! ```text
//! Draft ──> Active <──> Paused
//!             │            │
//!             └──> Ended <─┘   (Ended is also reachable from Draft)
//! ```
//!
//! ## Turn
//!
//! The window during which exactly one participant is authorized to
//! contribute. Turn numbers are monotonically non-decreasing and are the
//! sole ordering key for idempotent event processing.
//!
//! ## Strategy
//!
//! The pluggable policy deciding turn order and advancement. The strategy
//! set is closed, so [`TurnStrategy`] is a tagged union dispatched with
//! `match` rather than an open trait.

pub mod core;
pub mod discussion;
pub mod event;
pub mod strategy;
pub mod turn;

// Re-export commonly used types
pub use crate::core::error::DomainError;
pub use crate::core::id::{ConnectionId, DiscussionId, EventId, ParticipantId, PrincipalId};
pub use discussion::{
    entities::{CurrentTurn, Discussion, DiscussionPhase},
    message::Message,
    participant::{Participant, ParticipantPreferences, ParticipantRole},
    settings::DiscussionSettings,
};
pub use event::{DiscussionEvent, DiscussionEventKind};
pub use strategy::{
    ContextAwareConfig, ExpertiseDrivenConfig, FreeFormConfig, RoundRobinConfig, TurnStrategy,
};
pub use turn::record::{TurnEndReason, TurnHistory, TurnRecord};
