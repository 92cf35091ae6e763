// End-to-end relay tests: bridge between a fake kdb+ process and a WebSocket server

use super::helpers::{
    FakeKdb, STEP_TIMEOUT, accept_kdb, accept_target, bind_local, bridge_exit, loopback_config,
    spawn_bridge,
};

use relay_core::error::{FatalError, KdbError, WsError};
use relay_core::kdb::K;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

/// Start a bridge with every callback enabled and return both connected peers
/// once the Init callback has arrived.
async fn connected_bridge() -> (
    FakeKdb,
    WebSocketStream<TcpStream>,
    JoinHandle<FatalError>,
) {
    let (kdb_listener, kdb_port) = bind_local().await;
    let (ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .build()
        .expect("Invalid test config");

    let bridge = spawn_bridge(config);
    let mut kdb = accept_kdb(&kdb_listener).await;
    let target = accept_target(&ws_listener).await;

    kdb.expect_callback(".ws.init", K::Boolean(true)).await;
    (kdb, target, bridge)
}

async fn next_frame(target: &mut WebSocketStream<TcpStream>) -> Message {
    timeout(STEP_TIMEOUT, target.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Target stream ended")
        .expect("Failed to read frame")
}

// ============================================
// RELAY
// ============================================

/// **VALUE**: Verifies a `message` call from q reaches the target and is acknowledged.
///
/// **WHY THIS MATTERS**: This is the whole point of the bridge. The q side relies on
/// the Ack callback to know the payload left the process.
///
/// **BUG THIS CATCHES**: Payload re-encoded, sent as binary, or acknowledged before
/// it was written.
#[tokio::test]
async fn given_message_call_when_sent_by_kdb_then_target_receives_text_and_kdb_gets_ack() {
    // GIVEN
    let (mut kdb, mut target, _bridge) = connected_bridge().await;

    // WHEN
    kdb.call("message", "hello").await;

    // THEN
    assert_eq!(next_frame(&mut target).await, Message::text("hello"));
    kdb.expect_callback(".ws.ack", K::Boolean(true)).await;
}

/// **VALUE**: Verifies target frames are delivered to q through the Msg callback.
#[tokio::test]
async fn given_target_frames_when_received_then_kdb_gets_msg_callbacks() {
    let (mut kdb, mut target, _bridge) = connected_bridge().await;

    target
        .send(Message::text("{\"px\":101.5}"))
        .await
        .expect("Failed to send text frame");
    target
        .send(Message::binary(b"raw".to_vec()))
        .await
        .expect("Failed to send binary frame");

    kdb.expect_callback(".ws.msg", K::text("{\"px\":101.5}"))
        .await;
    kdb.expect_callback(".ws.msg", K::text("raw")).await;
}

/// **VALUE**: Verifies a bad unit is answered with an Error callback and the bridge
/// keeps relaying afterwards.
#[tokio::test]
async fn given_invalid_unit_when_sent_by_kdb_then_error_callback_and_relay_continues() {
    // GIVEN
    let (mut kdb, mut target, _bridge) = connected_bridge().await;

    // WHEN: (`message; 42)
    kdb.writer
        .send_async(&K::List(vec![K::symbol("message"), K::Long(42)]))
        .await
        .expect("Failed to send unit");

    // THEN
    kdb.expect_callback(".ws.err", K::Error(String::from("message-type")))
        .await;

    kdb.call("message", "still alive").await;
    assert_eq!(next_frame(&mut target).await, Message::text("still alive"));
    kdb.expect_callback(".ws.ack", K::Boolean(true)).await;
}

#[tokio::test]
async fn given_unknown_method_when_sent_by_kdb_then_error_callback_reports_it() {
    let (mut kdb, _target, _bridge) = connected_bridge().await;

    kdb.call("subscribe", "trades").await;

    kdb.expect_callback(".ws.err", K::Error(String::from("unsupported method")))
        .await;
}

/// **VALUE**: Verifies ordering within one direction is preserved.
#[tokio::test]
async fn given_several_calls_when_sent_by_kdb_then_target_receives_them_in_order() {
    let (mut kdb, mut target, _bridge) = connected_bridge().await;

    for payload in ["a", "b", "c"] {
        kdb.call("message", payload).await;
    }

    for payload in ["a", "b", "c"] {
        assert_eq!(next_frame(&mut target).await, Message::text(payload));
        kdb.expect_callback(".ws.ack", K::Boolean(true)).await;
    }
}

// ============================================
// SHUTDOWN
// ============================================

/// **VALUE**: Verifies the target closing sends Close to q and stops the bridge.
///
/// **WHY THIS MATTERS**: q code uses the Close callback to reconnect or alert; the
/// process exit code tells supervisors which side failed.
#[tokio::test]
async fn given_target_closes_when_running_then_kdb_gets_close_and_bridge_stops() {
    // GIVEN
    let (mut kdb, mut target, bridge) = connected_bridge().await;

    // WHEN
    target.close(None).await.expect("Failed to close target");

    // THEN
    kdb.expect_callback(".ws.close", K::Boolean(true)).await;
    let fatal = bridge_exit(bridge).await;
    assert!(matches!(fatal, FatalError::TargetRead(WsError::Closed { .. })));
}

/// **VALUE**: Verifies kdb+ going away stops the bridge without touching the target.
#[tokio::test]
async fn given_kdb_disconnects_when_running_then_bridge_stops_with_kdb_read_error() {
    let (kdb, _target, bridge) = connected_bridge().await;

    drop(kdb);

    let fatal = bridge_exit(bridge).await;
    assert!(matches!(fatal, FatalError::KdbRead(KdbError::Closed { .. })));
}
