//! Per-discussion settings

use crate::core::error::DomainError;
use crate::strategy::TurnStrategy;
use serde::{Deserialize, Serialize};

/// Settings fixed at creation time and applied for the discussion's lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    /// End the discussion automatically after this many completed turns
    pub max_turns: Option<u64>,
    /// Base per-turn time budget in seconds
    pub turn_timeout_seconds: u64,
    /// Turn-taking policy
    pub strategy: TurnStrategy,
    /// Hard cap on the participant roster
    pub max_participants: usize,
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            max_turns: None,
            turn_timeout_seconds: 300,
            strategy: TurnStrategy::default(),
            max_participants: 16,
        }
    }
}

impl DiscussionSettings {
    /// Validate the settings before the aggregate is allocated
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.turn_timeout_seconds == 0 {
            return Err(DomainError::Validation(
                "turn_timeout_seconds must be greater than zero".into(),
            ));
        }
        if self.max_participants == 0 {
            return Err(DomainError::Validation(
                "max_participants must be greater than zero".into(),
            ));
        }
        if let Some(max_turns) = self.max_turns
            && max_turns == 0
        {
            return Err(DomainError::Validation(
                "max_turns must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = DiscussionSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.turn_timeout_seconds, 300);
        assert_eq!(settings.max_participants, 16);
        assert!(settings.max_turns.is_none());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = DiscussionSettings {
            turn_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_max_turns_is_rejected() {
        let settings = DiscussionSettings {
            max_turns: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: DiscussionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, DiscussionSettings::default());
    }
}
