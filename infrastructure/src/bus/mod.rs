//! Durable bus adapters

mod memory;

pub use memory::InMemoryEventBus;
