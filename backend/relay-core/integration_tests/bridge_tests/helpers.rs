//! Test helpers for bridge integration tests.
//!
//! This module provides the two peers the bridge connects to:
//! - A fake kdb+ process that accepts the login and speaks IPC
//! - A WebSocket server standing in for the target

use relay_core::callback::{CallbackKind, invocation};
use relay_core::config::{BridgeConfig, BridgeConfigBuilder};
use relay_core::error::FatalError;
use relay_core::kdb::{K, KdbMessage, KdbReader, KdbWriter};
use relay_core::run_bridge;

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{WebSocketStream, accept_async, accept_hdr_async};

/// Upper bound for any single step of a test.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability byte the fake kdb+ process answers the login with.
pub const FAKE_KDB_CAPABILITY: u8 = 3;

/// The fake kdb+ end of an accepted connection.
pub struct FakeKdb {
    pub login: Vec<u8>,
    pub reader: KdbReader<OwnedReadHalf>,
    pub writer: KdbWriter<OwnedWriteHalf>,
}

impl FakeKdb {
    /// Read the next message, failing the test if none arrives in time.
    pub async fn next(&mut self) -> KdbMessage {
        timeout(STEP_TIMEOUT, self.reader.read_message())
            .await
            .expect("Timed out waiting for a callback")
            .expect("Failed to read callback")
    }

    /// Assert the next message is `(name; arg)`.
    pub async fn expect_callback(&mut self, name: &str, arg: K) {
        let message = self.next().await;
        assert_eq!(message.value, invocation(name, arg));
    }

    /// Send `(`method; "payload")` as the q side would with `neg[h]`.
    pub async fn call(&mut self, method: &str, payload: &str) {
        self.writer
            .send_async(&K::List(vec![K::symbol(method), K::text(payload)]))
            .await
            .expect("Failed to send unit to bridge");
    }
}

/// Bind a loopback listener on an ephemeral port.
pub async fn bind_local() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let port = listener
        .local_addr()
        .expect("Failed to read listener address")
        .port();
    (listener, port)
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let (listener, port) = bind_local().await;
    drop(listener);
    port
}

/// Accept one bridge connection and complete the kdb+ login.
pub async fn accept_kdb(listener: &TcpListener) -> FakeKdb {
    let (mut stream, _) = timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("Timed out waiting for the bridge to dial kdb+")
        .expect("Failed to accept kdb+ connection");

    let login = read_login(&mut stream).await;
    stream
        .write_all(&[FAKE_KDB_CAPABILITY])
        .await
        .expect("Failed to answer login");

    let (read, write) = stream.into_split();
    FakeKdb {
        login,
        reader: KdbReader::new(read),
        writer: KdbWriter::new(write),
    }
}

async fn read_login(stream: &mut TcpStream) -> Vec<u8> {
    let mut login = Vec::new();
    loop {
        let byte = stream.read_u8().await.expect("Failed to read login");
        if byte == 0 {
            return login;
        }
        login.push(byte);
    }
}

/// Accept one WebSocket upgrade.
pub async fn accept_target(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("Timed out waiting for the bridge to dial the target")
        .expect("Failed to accept target connection");
    accept_async(stream)
        .await
        .expect("WebSocket upgrade failed")
}

/// Accept one WebSocket upgrade and return the `Authorization` header it carried.
pub async fn accept_target_with_auth(
    listener: &TcpListener,
) -> (WebSocketStream<TcpStream>, Option<String>) {
    let (stream, _) = timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("Timed out waiting for the bridge to dial the target")
        .expect("Failed to accept target connection");

    let mut authorization = None;
    let ws = accept_hdr_async(stream, |request: &Request, response: Response| {
        authorization = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        Ok(response)
    })
    .await
    .expect("WebSocket upgrade failed");

    (ws, authorization)
}

/// Builder pointed at both loopback ports with every callback enabled.
pub fn loopback_config(kdb_port: u16, ws_port: u16) -> BridgeConfigBuilder {
    let mut builder = BridgeConfig::builder()
        .with_kdb_host("127.0.0.1")
        .with_kdb_port(kdb_port)
        .with_ws_host(format!("127.0.0.1:{ws_port}"))
        .with_ws_path("feed");
    for kind in CallbackKind::ALL {
        builder = builder.with_callback(kind, callback_name(kind));
    }
    builder
}

/// Name the fake kdb+ process uses for each callback.
pub fn callback_name(kind: CallbackKind) -> &'static str {
    match kind {
        CallbackKind::Init => ".ws.init",
        CallbackKind::Msg => ".ws.msg",
        CallbackKind::Ack => ".ws.ack",
        CallbackKind::Error => ".ws.err",
        CallbackKind::Close => ".ws.close",
    }
}

/// Run the bridge on its own task.
pub fn spawn_bridge(config: BridgeConfig) -> JoinHandle<FatalError> {
    tokio::spawn(async move { run_bridge(&config, None).await })
}

/// Wait for the bridge to stop and return why.
pub async fn bridge_exit(bridge: JoinHandle<FatalError>) -> FatalError {
    timeout(STEP_TIMEOUT, bridge)
        .await
        .expect("Bridge did not stop")
        .expect("Bridge task panicked")
}
