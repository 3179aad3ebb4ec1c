//! Room lifecycle and message fan-out.

use axum::extract::ws::Message;

use circuitforge_api::ws::RoomManager;
use circuitforge_core::protocol::ServerMessage;

fn left(participant_id: &str) -> ServerMessage {
    ServerMessage::ParticipantLeft {
        participant_id: participant_id.to_string(),
    }
}

fn text_of(msg: Message) -> String {
    match msg {
        Message::Text(text) => text.to_string(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn rooms_are_created_on_first_join_and_dropped_when_empty() {
    let manager = RoomManager::new();
    assert_eq!(manager.room_count().await, 0);

    let (room, _rx1) = manager.join("ABC123", "p1").await;
    let (_, _rx2) = manager.join("ABC123", "p2").await;
    assert_eq!(manager.room_count().await, 1);
    assert_eq!(room.connection_count().await, 2);

    assert!(!manager.leave("ABC123", "p1").await);
    assert!(manager.leave("ABC123", "p2").await);
    assert_eq!(manager.room_count().await, 0);
    assert!(manager.get("ABC123").await.is_none());
}

#[tokio::test]
async fn sessions_get_separate_rooms() {
    let manager = RoomManager::new();
    let (room_a, _rx_a) = manager.join("AAAAAA", "p1").await;
    let (room_b, mut rx_b) = manager.join("BBBBBB", "p1").await;
    assert_eq!(manager.room_count().await, 2);

    room_a.broadcast(&left("p9")).await;
    assert!(rx_b.try_recv().is_err());

    room_b.broadcast(&left("p9")).await;
    assert!(rx_b.try_recv().is_ok());
}

#[tokio::test]
async fn broadcast_reaches_every_connection() {
    let manager = RoomManager::new();
    let (room, mut rx1) = manager.join("ABC123", "p1").await;
    let (_, mut rx2) = manager.join("ABC123", "p2").await;

    room.broadcast(&left("p3")).await;

    for rx in [&mut rx1, &mut rx2] {
        let frame = text_of(rx.try_recv().unwrap());
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "presence:participant:left");
        assert_eq!(json["payload"]["participantId"], "p3");
    }
}

#[tokio::test]
async fn broadcast_except_skips_the_originator() {
    let manager = RoomManager::new();
    let (room, mut rx1) = manager.join("ABC123", "p1").await;
    let (_, mut rx2) = manager.join("ABC123", "p2").await;

    room.broadcast_except("p1", &left("p1")).await;
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_ok());
}

#[tokio::test]
async fn send_to_targets_one_participant() {
    let manager = RoomManager::new();
    let (room, mut rx1) = manager.join("ABC123", "p1").await;
    let (_, mut rx2) = manager.join("ABC123", "p2").await;

    assert!(room.send_to("p2", &left("x")).await);
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_ok());

    assert!(!room.send_to("ghost", &left("x")).await);
}

#[tokio::test]
async fn close_sends_a_close_frame_and_removes_the_connection() {
    let manager = RoomManager::new();
    let (room, mut rx) = manager.join("ABC123", "p1").await;

    room.close("p1").await;
    assert!(matches!(rx.try_recv().unwrap(), Message::Close(None)));
    assert_eq!(room.connection_count().await, 0);
}

#[tokio::test]
async fn shutdown_all_closes_everything() {
    let manager = RoomManager::new();
    let (_, mut rx1) = manager.join("AAAAAA", "p1").await;
    let (_, mut rx2) = manager.join("BBBBBB", "p1").await;

    manager.shutdown_all().await;
    assert!(matches!(rx1.try_recv().unwrap(), Message::Close(None)));
    assert!(matches!(rx2.try_recv().unwrap(), Message::Close(None)));
    assert_eq!(manager.room_count().await, 0);
}
