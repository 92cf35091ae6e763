use crate::error::callback::CallbackError;
use crate::error::kdb::KdbError;
use crate::error::ws::WsError;

use thiserror::Error as ThisError;

/// Why the bridge stopped. There is no recovery from any of these; the binary
/// maps each variant to its own exit code.
#[derive(Debug, ThisError)]
pub enum FatalError {
    #[error("Error connecting to kdb+ process: {0}")]
    KdbDial(#[source] KdbError),

    #[error("Error connecting to WebSocket target: {0}")]
    WsDial(#[source] WsError),

    #[error("Error reading from kdb+ handle: {0}")]
    KdbRead(#[source] KdbError),

    #[error("Error reading from WebSocket handle: {0}")]
    TargetRead(#[source] WsError),

    #[error(transparent)]
    Callback(#[from] CallbackError),
}
