//! Engine error type

use crate::ports::discussion_store::StoreError;
use parley_domain::{DiscussionId, DomainError};
use thiserror::Error;

/// Errors returned by the command surface
///
/// Validation and state-transition errors are synchronous and carry no side
/// effects. A persistence failure means the command aborted entirely: the
/// in-memory state did not advance and no event was broadcast. Bus publish
/// failures never surface here; they are retried asynchronously.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Discussion '{0}' does not exist")]
    NotFound(DiscussionId),

    #[error("Engine is shutting down")]
    Shutdown,
}

impl EngineError {
    /// Whether retrying the same command could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_failures_are_retryable() {
        assert!(EngineError::Persistence(StoreError::Backend("io".into())).is_retryable());
        assert!(!EngineError::Domain(DomainError::NoEligibleParticipant).is_retryable());
        assert!(!EngineError::NotFound("d".into()).is_retryable());
    }
}
