//! Connection layer adapters

mod memory;

pub use memory::ChannelConnectionSink;
