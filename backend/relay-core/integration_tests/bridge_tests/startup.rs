// Startup tests: login, authentication header, and dial failures

use super::helpers::{
    accept_kdb, accept_target, accept_target_with_auth, bind_local, bridge_exit, closed_port,
    loopback_config, spawn_bridge,
};

use relay_core::callback::CallbackKind;
use relay_core::error::{FatalError, KdbError, WsError};
use relay_core::kdb::K;

/// **VALUE**: Verifies kdb+ credentials and the target Authorization header are sent.
///
/// **WHY THIS MATTERS**: Both peers typically sit behind authentication; a missing
/// header or a wrong login string fails the bridge at startup.
#[tokio::test]
async fn given_credentials_when_bridge_starts_then_both_peers_receive_them() {
    // GIVEN
    let (kdb_listener, kdb_port) = bind_local().await;
    let (ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .with_kdb_auth("user:pass")
        .with_ws_auth_type("Basic")
        .with_ws_auth("alice:secret")
        .build()
        .expect("Invalid test config");

    // WHEN
    let _bridge = spawn_bridge(config);
    let mut kdb = accept_kdb(&kdb_listener).await;
    let (_target, authorization) = accept_target_with_auth(&ws_listener).await;

    // THEN
    assert_eq!(kdb.login, b"user:pass\x03");
    assert_eq!(authorization.as_deref(), Some("Basic YWxpY2U6c2VjcmV0"));
    kdb.expect_callback(".ws.init", K::Boolean(true)).await;
}

#[tokio::test]
async fn given_no_target_auth_when_bridge_starts_then_no_authorization_header() {
    let (kdb_listener, kdb_port) = bind_local().await;
    let (ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .build()
        .expect("Invalid test config");

    let _bridge = spawn_bridge(config);
    let _kdb = accept_kdb(&kdb_listener).await;
    let (_target, authorization) = accept_target_with_auth(&ws_listener).await;

    assert_eq!(authorization, None);
}

/// **VALUE**: Verifies a disabled Init callback sends nothing at startup.
#[tokio::test]
async fn given_init_disabled_when_bridge_starts_then_first_callback_is_msg() {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    let (kdb_listener, kdb_port) = bind_local().await;
    let (ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .with_callback(CallbackKind::Init, "")
        .build()
        .expect("Invalid test config");

    let _bridge = spawn_bridge(config);
    let mut kdb = accept_kdb(&kdb_listener).await;
    let mut target = accept_target(&ws_listener).await;
    target
        .send(Message::text("first"))
        .await
        .expect("Failed to send frame");

    kdb.expect_callback(".ws.msg", K::text("first")).await;
}

// ============================================
// DIAL FAILURES
// ============================================

/// **VALUE**: Verifies an unreachable kdb+ process is a kdb+ dial failure.
#[tokio::test]
async fn given_no_kdb_process_when_bridge_starts_then_fails_with_kdb_dial() {
    let kdb_port = closed_port().await;
    let (_ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .build()
        .expect("Invalid test config");

    let fatal = bridge_exit(spawn_bridge(config)).await;

    assert!(matches!(fatal, FatalError::KdbDial(KdbError::Dial { .. })));
}

/// **VALUE**: Verifies a refused kdb+ login is reported as a kdb+ dial failure.
#[tokio::test]
async fn given_kdb_rejects_login_when_bridge_starts_then_fails_with_kdb_dial() {
    use tokio::io::AsyncReadExt;

    let (kdb_listener, kdb_port) = bind_local().await;
    let (_ws_listener, ws_port) = bind_local().await;
    let config = loopback_config(kdb_port, ws_port)
        .with_kdb_auth("bad:creds")
        .build()
        .expect("Invalid test config");

    let bridge = spawn_bridge(config);
    let (mut stream, _) = kdb_listener.accept().await.expect("accept");
    let mut login = [0u8; 11];
    stream.read_exact(&mut login).await.expect("login");
    drop(stream);

    let fatal = bridge_exit(bridge).await;
    assert!(matches!(
        fatal,
        FatalError::KdbDial(KdbError::Handshake { .. })
    ));
}

/// **VALUE**: Verifies an unreachable target is a WebSocket dial failure, reported
/// after the kdb+ login succeeded and before any callback.
#[tokio::test]
async fn given_no_target_when_bridge_starts_then_fails_with_ws_dial() {
    // GIVEN
    let (kdb_listener, kdb_port) = bind_local().await;
    let ws_port = closed_port().await;
    let config = loopback_config(kdb_port, ws_port)
        .build()
        .expect("Invalid test config");

    // WHEN
    let bridge = spawn_bridge(config);
    let mut kdb = accept_kdb(&kdb_listener).await;

    // THEN
    let fatal = bridge_exit(bridge).await;
    assert!(matches!(fatal, FatalError::WsDial(WsError::Dial { .. })));
    assert!(kdb.reader.read_message().await.is_err());
}
