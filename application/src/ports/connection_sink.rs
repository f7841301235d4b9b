//! Live connection port
//!
//! The engine treats the persistent connection layer (e.g. WebSocket) as a
//! fan-out sink with per-connection ordering only. The engine does not
//! manage authentication; it trusts the caller-supplied principal.

use parley_domain::{ConnectionId, DiscussionEvent};

/// Delivery sink for one live connection
///
/// `send` must never block: a slow or broken connection degrades only
/// itself, never the mutation path that produced the event. Delivery is
/// best-effort; reconnecting clients re-sync through the store, not
/// through event replay.
pub trait ConnectionSink: Send + Sync {
    fn send(&self, connection_id: &ConnectionId, event: &DiscussionEvent);
}
