//! Discussion store adapters

mod memory;

pub use memory::InMemoryDiscussionStore;
