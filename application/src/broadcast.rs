//! Event broadcaster: room fan-out to live connections
//!
//! Rooms are keyed by discussion id; connections subscribe and unsubscribe
//! explicitly. Broadcast is fire-and-forget per connection and fully
//! independent of the persistence path: a stuck connection degrades only
//! itself. Per-connection ordering follows from the single producer per
//! discussion; there is no cross-connection ordering or delivery guarantee,
//! and no replay — reconnecting clients re-sync through the store.

use crate::ports::connection_sink::ConnectionSink;
use parley_domain::{ConnectionId, DiscussionEvent, DiscussionId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::trace;

pub struct EventBroadcaster {
    sink: Arc<dyn ConnectionSink>,
    rooms: Mutex<HashMap<DiscussionId, HashSet<ConnectionId>>>,
}

impl EventBroadcaster {
    pub fn new(sink: Arc<dyn ConnectionSink>) -> Self {
        Self {
            sink,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a connection to a discussion's events
    pub fn join_room(&self, connection_id: ConnectionId, discussion_id: &DiscussionId) {
        let Ok(mut rooms) = self.rooms.lock() else {
            return;
        };
        rooms
            .entry(discussion_id.clone())
            .or_default()
            .insert(connection_id);
    }

    /// Unsubscribe a connection from a discussion's events
    pub fn leave_room(&self, connection_id: &ConnectionId, discussion_id: &DiscussionId) {
        let Ok(mut rooms) = self.rooms.lock() else {
            return;
        };
        if let Some(members) = rooms.get_mut(discussion_id) {
            members.remove(connection_id);
            if members.is_empty() {
                rooms.remove(discussion_id);
            }
        }
    }

    /// Drop a closed connection from every room
    pub fn leave_all_rooms(&self, connection_id: &ConnectionId) {
        let Ok(mut rooms) = self.rooms.lock() else {
            return;
        };
        rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    pub fn room_size(&self, discussion_id: &DiscussionId) -> usize {
        self.rooms
            .lock()
            .map(|rooms| rooms.get(discussion_id).map_or(0, HashSet::len))
            .unwrap_or(0)
    }

    /// Fan the event out to every connection in its room.
    ///
    /// Sends happen outside the registry lock; the sink contract makes each
    /// one non-blocking.
    pub fn broadcast(&self, event: &DiscussionEvent) {
        let members: Vec<ConnectionId> = {
            let Ok(rooms) = self.rooms.lock() else {
                return;
            };
            rooms
                .get(&event.discussion_id)
                .map(|members| members.iter().cloned().collect())
                .unwrap_or_default()
        };
        trace!(
            discussion_id = %event.discussion_id,
            event_type = event.kind.event_type(),
            connections = members.len(),
            "Broadcasting event"
        );
        for connection_id in &members {
            self.sink.send(connection_id, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::DiscussionEventKind;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(ConnectionId, String)>>,
    }

    impl ConnectionSink for RecordingSink {
        fn send(&self, connection_id: &ConnectionId, event: &DiscussionEvent) {
            self.sent
                .lock()
                .unwrap()
                .push((connection_id.clone(), event.kind.event_type().to_string()));
        }
    }

    fn event(discussion: &str) -> DiscussionEvent {
        DiscussionEvent::new(discussion.into(), 1, DiscussionEventKind::DiscussionPaused)
    }

    #[test]
    fn test_broadcast_reaches_room_members_only() {
        let sink = Arc::new(RecordingSink::default());
        let broadcaster = EventBroadcaster::new(sink.clone());

        broadcaster.join_room("conn-1".into(), &"disc-1".into());
        broadcaster.join_room("conn-2".into(), &"disc-1".into());
        broadcaster.join_room("conn-3".into(), &"disc-2".into());

        broadcaster.broadcast(&event("disc-1"));

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(c, _)| c.as_str() != "conn-3"));
    }

    #[test]
    fn test_leave_room_stops_delivery() {
        let sink = Arc::new(RecordingSink::default());
        let broadcaster = EventBroadcaster::new(sink.clone());

        broadcaster.join_room("conn-1".into(), &"disc-1".into());
        broadcaster.leave_room(&"conn-1".into(), &"disc-1".into());
        assert_eq!(broadcaster.room_size(&"disc-1".into()), 0);

        broadcaster.broadcast(&event("disc-1"));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_leave_all_rooms() {
        let sink = Arc::new(RecordingSink::default());
        let broadcaster = EventBroadcaster::new(sink.clone());

        broadcaster.join_room("conn-1".into(), &"disc-1".into());
        broadcaster.join_room("conn-1".into(), &"disc-2".into());
        broadcaster.join_room("conn-2".into(), &"disc-2".into());

        broadcaster.leave_all_rooms(&"conn-1".into());
        assert_eq!(broadcaster.room_size(&"disc-1".into()), 0);
        assert_eq!(broadcaster.room_size(&"disc-2".into()), 1);
    }

    #[test]
    fn test_broadcast_to_empty_room_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let broadcaster = EventBroadcaster::new(sink.clone());
        broadcaster.broadcast(&event("disc-1"));
        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
