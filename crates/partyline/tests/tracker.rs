//! Integration tests for the party tracker.
//!
//! The first half feeds connection events straight into
//! [`PartyTracker::handle_event`] to pin down the merge rules. The second
//! half runs the whole stack against a local WebSocket server that speaks
//! the party wire format.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use partyline::prelude::*;
use partyline::protocol::{C2s, Join, PartyData, S2c, UserJoin, UserPart, WireMessage};
use partyline::session::passphrase_to_id;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

const PARTY: PartyId = PartyId(77);

/// A tracker whose connection is never opened; events are injected with
/// `handle_event`.
fn offline_tracker() -> PartyTracker {
    let config = ConnectionConfig::new("ws://127.0.0.1:9");
    PartyTracker::websocket(config)
}

fn data(member: i64, type_name: &str, body: serde_json::Value) -> ConnectionEvent {
    ConnectionEvent::PartyData(PartyData {
        party_id: PARTY,
        member_id: MemberId(member),
        type_name: type_name.to_string(),
        body: Bytes::from(serde_json::to_vec(&body).unwrap()),
    })
}

fn part(member: i64) -> ConnectionEvent {
    ConnectionEvent::UserPart(UserPart {
        party_id: PARTY,
        member_id: MemberId(member),
    })
}

fn expect_update(event: Option<TrackerEvent>) -> MemberState {
    match event {
        Some(TrackerEvent::MemberUpdate { state, .. }) => state,
        other => panic!("expected MemberUpdate, got {other:?}"),
    }
}

// =========================================================================
// Merge semantics
// =========================================================================

#[tokio::test]
async fn test_status_with_only_current_health_keeps_max() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 80, "hm": 99})));

    let state = expect_update(tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 12}))));

    let health = state.status.unwrap().health.unwrap();
    assert_eq!(health, Vital { current: Some(12), max: Some(99) });
}

#[tokio::test]
async fn test_status_without_health_keys_leaves_health_unchanged() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 80, "hm": 99, "pc": 40})));
    let before = tracker.member(MemberId(1)).unwrap().clone();

    let after = expect_update(tracker.handle_event(data(1, "StatusUpdate", json!({"r": 55}))));

    let (before, after) = (before.status.unwrap(), after.status.unwrap());
    assert_eq!(after.health, before.health);
    assert_eq!(after.prayer, before.prayer);
    assert_eq!(after.run_energy, Some(55));
}

#[tokio::test]
async fn test_slots_are_merged_independently() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"n": "Zezima"})));
    tracker.handle_event(data(1, "LocationUpdate", json!({"c": (3200 << 14) | 3216})));
    let state = expect_update(tracker.handle_event(data(
        1,
        "PartyBatchedChange",
        json!({"i": [4151, 1]}),
    )));

    assert_eq!(state.status.unwrap().name.as_deref(), Some("Zezima"));
    let coordinate = state.location.unwrap().coordinate.unwrap();
    assert_eq!((coordinate.x, coordinate.y), (3200, 3216));
    assert_eq!(state.batched.unwrap().inventory.unwrap().len(), 1);
}

#[tokio::test]
async fn test_members_are_tracked_separately() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 1})));
    tracker.handle_event(data(2, "StatusUpdate", json!({"hc": 2})));

    assert_eq!(tracker.members().len(), 2);
    let health = |id| {
        tracker.member(MemberId(id)).unwrap().status.as_ref().unwrap().health.unwrap().current
    };
    assert_eq!(health(1), Some(1));
    assert_eq!(health(2), Some(2));
}

// =========================================================================
// Failures leave state untouched
// =========================================================================

#[tokio::test]
async fn test_unknown_type_reports_error_without_state() {
    let mut tracker = offline_tracker();

    let event = tracker.handle_event(data(1, "Mystery", json!({})));

    match event {
        Some(TrackerEvent::Error(PartylineError::Pipeline(PipelineError::UnknownType(name)))) => {
            assert_eq!(name, "Mystery");
        }
        other => panic!("expected an unknown type error, got {other:?}"),
    }
    assert!(tracker.member(MemberId(1)).is_none());
}

#[tokio::test]
async fn test_invalid_body_keeps_previous_state() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 5})));

    let event = tracker.handle_event(data(1, "StatusUpdate", json!({"hc": "five"})));

    assert!(matches!(
        event,
        Some(TrackerEvent::Error(PartylineError::Pipeline(PipelineError::Validation { .. })))
    ));
    let status = tracker.member(MemberId(1)).unwrap().status.as_ref().unwrap();
    assert_eq!(status.health.unwrap().current, Some(5));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mut tracker = offline_tracker();
    let event = ConnectionEvent::PartyData(PartyData {
        party_id: PARTY,
        member_id: MemberId(3),
        type_name: "StatusUpdate".into(),
        body: Bytes::from_static(b"\xff not json"),
    });

    match tracker.handle_event(event) {
        Some(TrackerEvent::Error(PartylineError::MalformedBody { member_id, .. })) => {
            assert_eq!(member_id, MemberId(3));
        }
        other => panic!("expected MalformedBody, got {other:?}"),
    }
    assert!(tracker.members().is_empty());
}

// =========================================================================
// Parts, joins, custom payloads
// =========================================================================

#[tokio::test]
async fn test_part_of_untracked_member_fires_nothing() {
    let mut tracker = offline_tracker();
    assert!(tracker.handle_event(part(42)).is_none());
}

#[tokio::test]
async fn test_part_of_tracked_member_removes_once() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(5, "StatusUpdate", json!({"hc": 1})));

    assert!(matches!(
        tracker.handle_event(part(5)),
        Some(TrackerEvent::MemberRemoved(MemberId(5)))
    ));
    assert!(tracker.member(MemberId(5)).is_none());
    assert!(tracker.handle_event(part(5)).is_none());
}

#[tokio::test]
async fn test_join_is_passed_through_without_state() {
    let mut tracker = offline_tracker();
    let event = tracker.handle_event(ConnectionEvent::UserJoin(UserJoin {
        party_id: PARTY,
        member_id: MemberId(8),
    }));

    assert!(matches!(
        event,
        Some(TrackerEvent::MemberJoined { party_id: PARTY, member_id: MemberId(8) })
    ));
    assert!(tracker.members().is_empty());
}

#[tokio::test]
async fn test_custom_handler_output_is_surfaced_not_merged() {
    let mut registry = PayloadRegistry::new();
    registry.register_fn("Loot", |_| Ok(()), |body| body["item"].clone());
    let (connection, events) =
        ConnectionManager::websocket(ConnectionConfig::new("ws://127.0.0.1:9"));
    let mut tracker = PartyTracker::new(connection, events, Arc::new(registry));

    let event = tracker.handle_event(data(4, "Loot", json!({"item": "Twisted bow"})));

    match event {
        Some(TrackerEvent::CustomData { member_id, type_name, value }) => {
            assert_eq!(member_id, MemberId(4));
            assert_eq!(type_name, "Loot");
            assert_eq!(value, json!("Twisted bow"));
        }
        other => panic!("expected CustomData, got {other:?}"),
    }
    assert!(tracker.members().is_empty());
}

#[tokio::test]
async fn test_leave_party_when_offline_clears_members() {
    let mut tracker = offline_tracker();
    tracker.handle_event(data(1, "StatusUpdate", json!({"hc": 1})));
    tracker.handle_event(data(2, "StatusUpdate", json!({"hc": 1})));

    tracker.leave_party().await.unwrap();

    assert!(tracker.members().is_empty());
}

#[tokio::test]
async fn test_send_when_offline_is_not_connected() {
    let tracker = offline_tracker();
    let err = tracker.send("StatusUpdate", &json!({"hc": 1})).await.unwrap_err();
    assert!(matches!(err, PartylineError::Session(SessionError::NotConnected)));
}

// =========================================================================
// End to end over a real socket
// =========================================================================

fn binary(envelope: S2c) -> Message {
    Message::Binary(envelope.encode().unwrap())
}

async fn next_tracker_event(tracker: &mut PartyTracker) -> TrackerEvent {
    tokio::time::timeout(Duration::from_secs(5), tracker.next_event())
        .await
        .expect("timed out waiting for a tracker event")
        .expect("connection task ended")
}

#[tokio::test]
async fn test_end_to_end_join_update_and_part() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // The server accepts one client, expects its Join, then plays back a
    // short party session.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = ws.next().await.unwrap().unwrap();
        let C2s::Join(Join { party_id, member_id }) = C2s::decode(&frame.into_data()).unwrap()
        else {
            panic!("expected a Join envelope");
        };

        ws.send(binary(S2c::UserJoin(UserJoin { party_id, member_id: MemberId(2) })))
            .await
            .unwrap();
        ws.send(binary(S2c::PartyData(PartyData {
            party_id,
            member_id: MemberId(2),
            type_name: "StatusUpdate".into(),
            body: Bytes::from_static(br##"{"hc":50,"hm":99,"c":"#80ff0000"}"##),
        })))
        .await
        .unwrap();
        ws.send(binary(S2c::UserPart(UserPart { party_id, member_id: MemberId(2) })))
            .await
            .unwrap();

        // Echo the client's broadcast back as our last frame.
        let frame = ws.next().await.unwrap().unwrap();
        let C2s::Data(sent) = C2s::decode(&frame.into_data()).unwrap() else {
            panic!("expected a Data envelope");
        };
        ws.send(binary(S2c::PartyData(PartyData {
            party_id,
            member_id,
            type_name: sent.type_name,
            body: sent.body,
        })))
        .await
        .unwrap();

        (party_id, member_id, ws)
    });

    let config = ConnectionConfig::new(format!("ws://{addr}/ws"));
    let mut tracker = PartyTracker::websocket(config);
    tracker.connect().await.unwrap();
    assert!(matches!(next_tracker_event(&mut tracker).await, TrackerEvent::Connected));

    let (party_id, me) = tracker
        .join_party("hunter2", Some(MemberId(1)))
        .await
        .unwrap();
    assert_eq!(party_id, passphrase_to_id("hunter2"));
    assert_eq!(me, MemberId(1));

    assert!(matches!(
        next_tracker_event(&mut tracker).await,
        TrackerEvent::MemberJoined { member_id: MemberId(2), .. }
    ));

    match next_tracker_event(&mut tracker).await {
        TrackerEvent::MemberUpdate { member_id, state } => {
            assert_eq!(member_id, MemberId(2));
            let status = state.status.unwrap();
            assert_eq!(status.health, Some(Vital { current: Some(50), max: Some(99) }));
            assert_eq!(status.member_color.map(|c| c.a), Some(128));
        }
        other => panic!("expected MemberUpdate, got {other:?}"),
    }

    assert!(matches!(
        next_tracker_event(&mut tracker).await,
        TrackerEvent::MemberRemoved(MemberId(2))
    ));

    tracker
        .send("LocationUpdate", &json!({"c": (1 << 28) | (3000 << 14) | 3000}))
        .await
        .unwrap();
    match next_tracker_event(&mut tracker).await {
        TrackerEvent::MemberUpdate { member_id, state } => {
            assert_eq!(member_id, MemberId(1));
            let coordinate = state.location.unwrap().coordinate.unwrap();
            assert_eq!((coordinate.x, coordinate.y, coordinate.plane), (3000, 3000, 1));
        }
        other => panic!("expected MemberUpdate, got {other:?}"),
    }

    let (server_party, server_member, _ws) = server.await.unwrap();
    assert_eq!(server_party, party_id);
    assert_eq!(server_member, MemberId(1));

    tracker.disconnect().await;
    assert!(tracker.members().is_empty());
    assert_eq!(tracker.connection().state(), ConnectionState::Disconnected);
}

/// Serves one client: waits for its Join, pushes a join and a status
/// update for member 2, then holds the socket until the client goes.
async fn spawn_chatty_server() -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = ws.next().await.unwrap().unwrap();
        let C2s::Join(Join { party_id, .. }) = C2s::decode(&frame.into_data()).unwrap() else {
            panic!("expected a Join envelope");
        };
        ws.send(binary(S2c::UserJoin(UserJoin { party_id, member_id: MemberId(2) })))
            .await
            .unwrap();
        ws.send(binary(S2c::PartyData(PartyData {
            party_id,
            member_id: MemberId(2),
            type_name: "StatusUpdate".into(),
            body: Bytes::from_static(br#"{"hc":50}"#),
        })))
        .await
        .unwrap();

        while let Some(Ok(_)) = ws.next().await {}
    });
    (format!("ws://{addr}"), server)
}

/// Connects and joins, then lets the server's frames pile up in the
/// tracker's queue without reading them.
async fn joined_tracker_with_queued_traffic(endpoint: String) -> PartyTracker {
    let mut tracker = PartyTracker::websocket(ConnectionConfig::new(endpoint));
    tracker.connect().await.unwrap();
    assert!(matches!(next_tracker_event(&mut tracker).await, TrackerEvent::Connected));
    tracker.join_party("hunter2", Some(MemberId(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    tracker
}

#[tokio::test]
async fn test_disconnect_discards_queued_party_traffic() {
    let (endpoint, server) = spawn_chatty_server().await;
    let mut tracker = joined_tracker_with_queued_traffic(endpoint).await;

    tracker.disconnect().await;
    assert!(tracker.members().is_empty());

    // The close is still reported; the stale join and update are not.
    assert!(matches!(
        next_tracker_event(&mut tracker).await,
        TrackerEvent::Disconnected(_)
    ));
    let next = tokio::time::timeout(Duration::from_millis(200), tracker.next_event()).await;
    assert!(next.is_err(), "unexpected event after disconnect: {next:?}");
    assert!(tracker.member(MemberId(2)).is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn test_leave_party_discards_queued_party_traffic() {
    let (endpoint, server) = spawn_chatty_server().await;
    let mut tracker = joined_tracker_with_queued_traffic(endpoint).await;

    tracker.leave_party().await.unwrap();
    assert!(tracker.members().is_empty());

    let next = tokio::time::timeout(Duration::from_millis(200), tracker.next_event()).await;
    assert!(next.is_err(), "unexpected event after leaving: {next:?}");
    assert!(tracker.member(MemberId(2)).is_none());

    tracker.disconnect().await;
    server.await.unwrap();
}
