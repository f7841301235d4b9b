//! Domain error types

use crate::discussion::entities::DiscussionPhase;
use thiserror::Error;

/// Domain-level errors
///
/// Validation and state-transition errors are returned synchronously to the
/// command issuer before any state mutation. [`DomainError::NoEligibleParticipant`]
/// is not fatal: it is surfaced as an `error` event and the discussion stays
/// on its prior turn until a participant becomes active again.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Operation '{operation}' is not legal while the discussion is {phase}")]
    InvalidStateTransition {
        phase: DiscussionPhase,
        operation: &'static str,
    },

    #[error("No eligible participant for the next turn")]
    NoEligibleParticipant,
}

impl DomainError {
    /// Check if this error represents an illegal lifecycle transition
    pub fn is_state_transition(&self) -> bool {
        matches!(self, DomainError::InvalidStateTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let error = DomainError::InvalidStateTransition {
            phase: DiscussionPhase::Ended,
            operation: "start",
        };
        assert_eq!(
            error.to_string(),
            "Operation 'start' is not legal while the discussion is ended"
        );
        assert!(error.is_state_transition());
    }

    #[test]
    fn test_validation_is_not_state_transition() {
        assert!(!DomainError::Validation("empty topic".into()).is_state_transition());
        assert!(!DomainError::NoEligibleParticipant.is_state_transition());
    }
}
