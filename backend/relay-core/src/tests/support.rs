// In-memory transports shared by the unit tests.

use crate::callback::CallbackEmitter;
use crate::config::CallbackNames;
use crate::kdb::{KdbReader, KdbWriter};

use tokio::io::{DuplexStream, ReadHalf, WriteHalf, duplex, split};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;

pub(crate) const PIPE_CAPACITY: usize = 64 * 1024;

/// Every callback enabled, named after its kind.
pub(crate) fn all_callbacks() -> CallbackNames {
    CallbackNames {
        init: Some(String::from("onInit")),
        msg: Some(String::from("onMsg")),
        ack: Some(String::from("onAck")),
        error: Some(String::from("onError")),
        close: Some(String::from("onClose")),
    }
}

/// Callback emitter writing into a pipe, plus a reader for the kdb+ end of it.
pub(crate) fn emitter_pipe(
    names: CallbackNames,
) -> (CallbackEmitter<DuplexStream>, KdbReader<DuplexStream>) {
    let (bridge_side, kdb_side) = duplex(PIPE_CAPACITY);
    (
        CallbackEmitter::new(KdbWriter::new(bridge_side), names),
        KdbReader::new(kdb_side),
    )
}

/// Both halves of a kdb+ pipe: the bridge reads from the first, the fake
/// kdb+ process writes into the second.
pub(crate) fn kdb_inbound_pipe() -> (
    KdbReader<ReadHalf<DuplexStream>>,
    KdbWriter<WriteHalf<DuplexStream>>,
) {
    let (bridge_side, kdb_side) = duplex(PIPE_CAPACITY);
    let (bridge_read, _bridge_write) = split(bridge_side);
    let (_kdb_read, kdb_write) = split(kdb_side);
    (KdbReader::new(bridge_read), KdbWriter::new(kdb_write))
}

/// A connected WebSocket pair: `(bridge client, target server)`.
pub(crate) async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    let (client_side, server_side) = duplex(PIPE_CAPACITY);
    let client = WebSocketStream::from_raw_socket(client_side, Role::Client, None).await;
    let server = WebSocketStream::from_raw_socket(server_side, Role::Server, None).await;
    (client, server)
}
