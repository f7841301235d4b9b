//! Event audit port
//!
//! Structured append-only logging of every emitted event, independent of
//! broadcast delivery. The JSONL adapter in the infrastructure layer is the
//! usual implementation.

use parley_domain::DiscussionEvent;

/// Sink for the audit trail of emitted events
pub trait EventAuditLogger: Send + Sync {
    fn log(&self, event: &DiscussionEvent);
}

/// No-op audit logger
pub struct NoEventAudit;

impl EventAuditLogger for NoEventAudit {
    fn log(&self, _event: &DiscussionEvent) {}
}
