//! In-memory discussion store
//!
//! Backs tests and single-process deployments. Honors the same contract a
//! database-backed adapter would: optimistic concurrency on the aggregate
//! and strictly consecutive, append-only turn records.

use async_trait::async_trait;
use parley_application::ports::discussion_store::{DiscussionStore, StoreError};
use parley_domain::{Discussion, DiscussionId, Participant, ParticipantId, TurnRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::trace;

#[derive(Default)]
struct StoredDiscussion {
    discussion: Option<Discussion>,
    participants: BTreeMap<ParticipantId, Participant>,
    turn_records: Vec<TurnRecord>,
}

/// `Mutex<HashMap>`-backed store with version-checked saves
#[derive(Default)]
pub struct InMemoryDiscussionStore {
    inner: Mutex<HashMap<DiscussionId, StoredDiscussion>>,
}

impl InMemoryDiscussionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn records appended so far (test/audit helper, not part of the
    /// port contract)
    pub fn turn_records(&self, discussion_id: &DiscussionId) -> Vec<TurnRecord> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner
            .get(discussion_id)
            .map(|entry| entry.turn_records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DiscussionStore for InMemoryDiscussionStore {
    async fn load_discussion(&self, id: &DiscussionId) -> Result<Discussion, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))?;
        inner
            .get(id)
            .and_then(|entry| entry.discussion.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn save_discussion(&self, discussion: &Discussion) -> Result<u64, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))?;
        let entry = inner.entry(discussion.id.clone()).or_default();

        if let Some(stored) = &entry.discussion
            && stored.version != discussion.version
        {
            return Err(StoreError::Conflict);
        }

        let mut saved = discussion.clone();
        saved.version += 1;
        let version = saved.version;
        trace!(discussion_id = %discussion.id, version, "Discussion saved");
        entry.discussion = Some(saved);
        Ok(version)
    }

    async fn save_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))?;
        let entry = inner
            .get_mut(&participant.discussion_id)
            .ok_or(StoreError::NotFound)?;
        entry
            .participants
            .insert(participant.id.clone(), participant.clone());
        Ok(())
    }

    async fn load_participants(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<Participant>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))?;
        Ok(inner
            .get(discussion_id)
            .map(|entry| entry.participants.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn append_turn_record(&self, record: &TurnRecord) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))?;
        let entry = inner
            .get_mut(&record.discussion_id)
            .ok_or(StoreError::NotFound)?;

        // Guard the monotonic, gap-free invariant at the storage edge too
        let expected = entry
            .turn_records
            .last()
            .map(|last| last.turn_number + 1)
            .unwrap_or(1);
        if record.turn_number != expected {
            return Err(StoreError::Backend(format!(
                "non-consecutive turn record: expected {expected}, got {}",
                record.turn_number
            )));
        }
        entry.turn_records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_domain::{DiscussionSettings, ParticipantRole, TurnEndReason};

    fn discussion() -> Discussion {
        Discussion::new(
            "disc-1",
            "topic",
            "title",
            "creator",
            DiscussionSettings::default(),
            Utc::now(),
        )
    }

    fn record(turn_number: u64) -> TurnRecord {
        TurnRecord {
            discussion_id: "disc-1".into(),
            turn_number,
            participant_id: "p-1".into(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            reason: TurnEndReason::Explicit,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let store = InMemoryDiscussionStore::new();
        let mut d = discussion();

        let version = store.save_discussion(&d).await.unwrap();
        assert_eq!(version, 1);
        d.version = version;

        let loaded = store.load_discussion(&d.id).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.topic, "topic");
    }

    #[tokio::test]
    async fn test_version_conflict_is_detected() {
        let store = InMemoryDiscussionStore::new();
        let mut d = discussion();
        d.version = store.save_discussion(&d).await.unwrap();

        // A stale writer holding the old version loses
        let stale = discussion();
        assert!(matches!(
            store.save_discussion(&stale).await,
            Err(StoreError::Conflict)
        ));

        // The current holder wins and bumps again
        assert_eq!(store.save_discussion(&d).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_discussion_is_not_found() {
        let store = InMemoryDiscussionStore::new();
        assert!(matches!(
            store.load_discussion(&"nope".into()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_participants_upsert() {
        let store = InMemoryDiscussionStore::new();
        let d = discussion();
        store.save_discussion(&d).await.unwrap();

        let mut p = Participant::new(
            "p-1",
            d.id.clone(),
            "alice",
            ParticipantRole::Participant,
            Utc::now(),
        );
        store.save_participant(&p).await.unwrap();
        p.record_message(Utc::now());
        store.save_participant(&p).await.unwrap();

        let loaded = store.load_participants(&d.id).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].message_count, 1);
    }

    #[tokio::test]
    async fn test_turn_records_must_be_consecutive() {
        let store = InMemoryDiscussionStore::new();
        store.save_discussion(&discussion()).await.unwrap();

        store.append_turn_record(&record(1)).await.unwrap();
        store.append_turn_record(&record(2)).await.unwrap();

        // Gaps and replays are both rejected
        assert!(store.append_turn_record(&record(4)).await.is_err());
        assert!(store.append_turn_record(&record(2)).await.is_err());

        let numbers: Vec<u64> = store
            .turn_records(&"disc-1".into())
            .iter()
            .map(|r| r.turn_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
