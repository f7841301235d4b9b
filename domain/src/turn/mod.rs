//! Turn records and history

pub mod record;

pub use record::{TurnEndReason, TurnHistory, TurnRecord};
