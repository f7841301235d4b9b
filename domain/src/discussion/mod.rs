//! Discussion aggregate: the discussion entity, its participants, settings,
//! and messages

pub mod entities;
pub mod message;
pub mod participant;
pub mod settings;

pub use entities::{CurrentTurn, Discussion, DiscussionPhase};
pub use message::Message;
pub use participant::{Participant, ParticipantPreferences, ParticipantRole};
pub use settings::DiscussionSettings;
