//! Persistence port
//!
//! Defines how the engine durably records discussions, participants, and
//! turn records. Writes must complete before the corresponding event is
//! broadcast; a failed write aborts the whole command with no in-memory
//! mutation.

use async_trait::async_trait;
use parley_domain::{Discussion, DiscussionId, Participant, TurnRecord};
use thiserror::Error;

/// Errors that can occur against the persistence store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Discussion not found")]
    NotFound,

    /// Optimistic concurrency token mismatch on save
    #[error("Version conflict on concurrent write")]
    Conflict,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable store for the discussion aggregate
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait DiscussionStore: Send + Sync {
    async fn load_discussion(&self, id: &DiscussionId) -> Result<Discussion, StoreError>;

    /// Persist the aggregate.
    ///
    /// The stored version must match `discussion.version` (zero for a new
    /// discussion); returns the new version on success, `Conflict` on a
    /// concurrent mismatch.
    async fn save_discussion(&self, discussion: &Discussion) -> Result<u64, StoreError>;

    async fn save_participant(&self, participant: &Participant) -> Result<(), StoreError>;

    async fn load_participants(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<Participant>, StoreError>;

    /// Append one completed turn. Turn records are append-only and strictly
    /// consecutive per discussion.
    async fn append_turn_record(&self, record: &TurnRecord) -> Result<(), StoreError>;
}
