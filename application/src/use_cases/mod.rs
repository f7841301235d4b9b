//! Use cases: lifecycle management and turn scheduling
//!
//! Both operate on a draft copy of the aggregate handed to them by the
//! discussion actor, which owns persistence ordering and event emission.

pub mod lifecycle;
pub mod scheduler;
