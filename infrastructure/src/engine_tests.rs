//! Full-engine scenario tests over the real in-memory adapters

use crate::bus::InMemoryEventBus;
use crate::connections::ChannelConnectionSink;
use crate::store::InMemoryDiscussionStore;
use parley_application::ports::event_audit::NoEventAudit;
use parley_application::{
    BridgeConfig, CreateDiscussionInput, CrossServiceBridge, DiscussionEngine, DiscussionStore,
    EngineConfig, EngineError, EventBroadcaster, EventBus, ParticipantSpec,
};
use parley_domain::{
    DiscussionEvent, DiscussionPhase, DiscussionSettings, DomainError, ParticipantRole,
    TurnEndReason,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct World {
    engine: Arc<DiscussionEngine>,
    store: Arc<InMemoryDiscussionStore>,
    bus: Arc<InMemoryEventBus>,
    sink: Arc<ChannelConnectionSink>,
}

async fn world() -> World {
    let store = Arc::new(InMemoryDiscussionStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let sink = Arc::new(ChannelConnectionSink::new());
    let broadcaster = Arc::new(EventBroadcaster::new(sink.clone()));
    let shutdown = CancellationToken::new();

    let bridge = CrossServiceBridge::new(bus.clone(), BridgeConfig::default(), shutdown);
    let engine = Arc::new(DiscussionEngine::new(
        store.clone(),
        broadcaster,
        bridge.outbound_sender(),
        Arc::new(NoEventAudit),
        EngineConfig::default(),
    ));
    bridge.spawn_inbound(engine.clone()).await.unwrap();

    World {
        engine,
        store,
        bus,
        sink,
    }
}

fn two_party_round_robin(timeout_secs: u64) -> CreateDiscussionInput {
    CreateDiscussionInput::new("Rust async runtimes", "Roundtable", "creator")
        .with_settings(DiscussionSettings {
            turn_timeout_seconds: timeout_secs,
            ..Default::default()
        })
        .with_participant(ParticipantSpec::new("alice", ParticipantRole::Participant))
        .with_participant(ParticipantSpec::new("bob", ParticipantRole::Participant))
}

/// Let spawned actors and pumps drain their queues
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<DiscussionEvent>) -> Vec<DiscussionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_round_robin_timeout_and_removal_scenario() {
    let w = world().await;
    let discussion = w.engine.create(two_party_round_robin(30)).await.unwrap();

    let mut connection = w.sink.register("conn-1".into());
    w.engine.join_room("conn-1".into(), &discussion.id);

    // start(): turn 1 goes to the earliest joiner
    w.engine.start(&discussion.id, "creator").await.unwrap();
    let alice = w
        .store
        .load_participants(&discussion.id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.principal_id.as_str() == "alice")
        .unwrap();
    let bob = w
        .store
        .load_participants(&discussion.id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.principal_id.as_str() == "bob")
        .unwrap();

    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.phase, DiscussionPhase::Active);
    assert_eq!(stored.current_turn.turn_number, 1);
    assert_eq!(stored.current_turn.participant_id, Some(alice.id.clone()));

    // No activity for the budget plus a moment: automatic advance to bob
    tokio::time::sleep(Duration::from_secs(31)).await;
    settle().await;
    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.current_turn.turn_number, 2);
    assert_eq!(stored.current_turn.participant_id, Some(bob.id.clone()));
    let records = w.store.turn_records(&discussion.id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reason, TurnEndReason::Timeout);

    // Removing the current speaker forces an immediate skip back to alice
    w.engine
        .remove_participant(&discussion.id, bob.id)
        .await
        .unwrap();
    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.current_turn.turn_number, 3);
    assert_eq!(stored.current_turn.participant_id, Some(alice.id.clone()));
    let records = w.store.turn_records(&discussion.id);
    assert_eq!(records.last().unwrap().reason, TurnEndReason::Skipped);

    // Removing the last active participant leaves the turn frozen
    w.engine
        .remove_participant(&discussion.id, alice.id.clone())
        .await
        .unwrap();
    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.current_turn.turn_number, 3);
    assert_eq!(stored.current_turn.participant_id, Some(alice.id));
    assert_eq!(w.store.turn_records(&discussion.id).len(), 2);

    settle().await;
    let types: Vec<String> = drain(&mut connection)
        .iter()
        .map(|e| e.kind.event_type().to_string())
        .collect();
    assert_eq!(
        types,
        vec![
            "discussion.started",
            "turn.changed",
            "turn.changed",
            "participant.left",
            "turn.changed",
            "participant.left",
            "error",
        ]
    );

    let records = w.store.turn_records(&discussion.id);
    let numbers: Vec<u64> = records.iter().map(|r| r.turn_number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_outbound_events_reach_the_bus_with_dedup_tags() {
    let w = world().await;
    let mut outbound = w.bus.subscribe("discussion.events").await.unwrap();

    let discussion = w.engine.create(two_party_round_robin(30)).await.unwrap();
    w.engine.start(&discussion.id, "creator").await.unwrap();
    w.engine
        .send_message(&discussion.id, "alice", "opening statement")
        .await
        .unwrap();
    settle().await;

    let mut payloads = Vec::new();
    while let Ok(payload) = outbound.try_recv() {
        payloads.push(payload);
    }
    let types: Vec<&str> = payloads
        .iter()
        .map(|p| p["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec!["discussion.started", "turn.changed", "message.received"]
    );
    // Every bus message carries the de-duplication id and the causal hint
    for payload in &payloads {
        assert!(payload["event_id"].is_string());
        assert!(payload["turn_number"].is_u64());
    }
}

#[tokio::test(start_paused = true)]
async fn test_inbound_bus_commands_are_idempotent() {
    let w = world().await;
    let discussion = w.engine.create(two_party_round_robin(30)).await.unwrap();
    w.engine.start(&discussion.id, "creator").await.unwrap();

    let envelope = serde_json::json!({
        "event_id": uuid::Uuid::new_v4().to_string(),
        "discussion_id": discussion.id.as_str(),
        "command": "add-message",
        "sender": "alice",
        "content": "tool execution finished",
    });

    // At-least-once delivery: the same envelope arrives twice
    w.bus
        .publish("discussion.commands", envelope.clone())
        .await
        .unwrap();
    w.bus
        .publish("discussion.commands", envelope)
        .await
        .unwrap();
    settle().await;

    let alice = w
        .store
        .load_participants(&discussion.id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.principal_id.as_str() == "alice")
        .unwrap();
    assert_eq!(alice.message_count, 1, "replay must not re-apply");
}

#[tokio::test(start_paused = true)]
async fn test_inbound_advance_passes_normal_validation() {
    let w = world().await;
    let discussion = w.engine.create(two_party_round_robin(30)).await.unwrap();
    w.engine.start(&discussion.id, "creator").await.unwrap();

    // bob does not hold the turn; the bridge must not bypass validation
    let envelope = serde_json::json!({
        "event_id": uuid::Uuid::new_v4().to_string(),
        "discussion_id": discussion.id.as_str(),
        "command": "advance-turn",
        "requested_by": "bob",
    });
    w.bus
        .publish("discussion.commands", envelope)
        .await
        .unwrap();
    settle().await;

    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.current_turn.turn_number, 1, "rejected command");

    // The current speaker advancing through the bus works
    let envelope = serde_json::json!({
        "event_id": uuid::Uuid::new_v4().to_string(),
        "discussion_id": discussion.id.as_str(),
        "command": "advance-turn",
        "requested_by": "alice",
    });
    w.bus
        .publish("discussion.commands", envelope)
        .await
        .unwrap();
    settle().await;

    let stored = w.store.load_discussion(&discussion.id).await.unwrap();
    assert_eq!(stored.current_turn.turn_number, 2);
}

#[tokio::test(start_paused = true)]
async fn test_discussions_are_independent_units_of_concurrency() {
    let w = world().await;
    let first = w.engine.create(two_party_round_robin(30)).await.unwrap();
    let second = w.engine.create(two_party_round_robin(300)).await.unwrap();

    w.engine.start(&first.id, "creator").await.unwrap();
    w.engine.start(&second.id, "creator").await.unwrap();
    w.engine.pause(&second.id).await.unwrap();

    // The first discussion times out on its own schedule; the paused one
    // stays exactly where it was
    tokio::time::sleep(Duration::from_secs(31)).await;
    settle().await;

    let first_stored = w.store.load_discussion(&first.id).await.unwrap();
    let second_stored = w.store.load_discussion(&second.id).await.unwrap();
    assert_eq!(first_stored.current_turn.turn_number, 2);
    assert_eq!(second_stored.phase, DiscussionPhase::Paused);
    assert_eq!(second_stored.current_turn.turn_number, 1);
}

#[tokio::test]
async fn test_ended_discussion_rejects_bus_and_client_commands_alike() {
    let w = world().await;
    let discussion = w.engine.create(two_party_round_robin(30)).await.unwrap();
    w.engine.start(&discussion.id, "creator").await.unwrap();
    w.engine.end(&discussion.id, "done").await.unwrap();

    let err = w
        .engine
        .send_message(&discussion.id, "alice", "too late")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::InvalidStateTransition { .. })
    ));

    // The same command via the bus is rejected by the same validation and
    // leaves no trace
    let envelope = serde_json::json!({
        "event_id": uuid::Uuid::new_v4().to_string(),
        "discussion_id": discussion.id.as_str(),
        "command": "add-message",
        "sender": "alice",
        "content": "too late",
    });
    w.bus
        .publish("discussion.commands", envelope)
        .await
        .unwrap();
    settle().await;

    let alice = w
        .store
        .load_participants(&discussion.id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.principal_id.as_str() == "alice")
        .unwrap();
    assert_eq!(alice.message_count, 0);
}
