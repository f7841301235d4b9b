//! Identifier newtypes
//!
//! Opaque string identifiers for the aggregate and its satellites, plus the
//! UUID-backed [`EventId`] used for receiver-side de-duplication.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<T: Into<String>> From<T> for $name {
            fn from(s: T) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Unique identifier for a discussion.
    DiscussionId
}

string_id! {
    /// Unique identifier for a participant within a discussion.
    ParticipantId
}

string_id! {
    /// Identifier of the acting principal (a user or an agent). The engine
    /// trusts the caller-supplied principal; authentication is out of scope.
    PrincipalId
}

string_id! {
    /// Identifier of a live connection subscribed to a discussion room.
    ConnectionId
}

/// Unique identifier for an emitted event.
///
/// Consumers on the durable bus de-duplicate by this id, since delivery is
/// at-least-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
