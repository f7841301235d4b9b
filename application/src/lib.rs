//! Application layer for parley
//!
//! This crate contains the orchestration engine proper: port definitions
//! for the external collaborators (persistence store, durable bus, live
//! connection layer), the lifecycle and turn-scheduling use cases, the
//! per-discussion actor runtime, the room broadcaster, and the
//! cross-service bridge. It depends only on the domain layer.
//!
//! # Concurrency model
//!
//! Each discussion is one serialization domain: a dedicated actor task owns
//! the aggregate and consumes a command queue sequentially, so no locks
//! guard the validate -> decide -> persist -> emit critical section. Turn
//! timers are a `select!` arm of the same actor loop, tagged with the turn
//! number they were armed for; a stale fire is a no-op. Discussions are
//! fully independent units of concurrency.

pub mod broadcast;
pub mod bridge;
pub mod engine;
pub mod error;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use broadcast::EventBroadcaster;
pub use bridge::{BridgeCommand, BridgeConfig, CrossServiceBridge, InboundEnvelope};
pub use engine::{DiscussionEngine, EngineConfig};
pub use error::EngineError;
pub use ports::{
    connection_sink::ConnectionSink,
    discussion_store::{DiscussionStore, StoreError},
    event_audit::{EventAuditLogger, NoEventAudit},
    event_bus::{BusError, EventBus},
};
pub use use_cases::lifecycle::{CreateDiscussionInput, LifecycleManager, ParticipantSpec};
pub use use_cases::scheduler::{TurnOutcome, TurnScheduler};
