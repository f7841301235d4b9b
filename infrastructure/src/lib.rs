//! Infrastructure layer for parley
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the in-memory discussion store with optimistic
//! concurrency, the in-memory durable bus, the channel-backed connection
//! sink, the JSONL event audit logger, and configuration file loading.

pub mod bus;
pub mod config;
pub mod connections;
pub mod logging;
pub mod store;

#[cfg(test)]
mod engine_tests;

// Re-export commonly used types
pub use bus::InMemoryEventBus;
pub use config::{ConfigLoader, EngineFileConfig, FileBridgeConfig, FileEngineConfig};
pub use connections::ChannelConnectionSink;
pub use logging::JsonlEventLogger;
pub use store::InMemoryDiscussionStore;
