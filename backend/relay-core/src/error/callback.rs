use crate::callback::CallbackKind;
use crate::error::kdb::KdbError;

use thiserror::Error as ThisError;

/// A callback could not be written to the kdb+ process.
///
/// Always fatal: the bridge has lost its control channel.
#[derive(Debug, ThisError)]
#[error("Callback Error: failed to send {kind} callback: {source}")]
pub struct CallbackError {
    pub kind: CallbackKind,
    #[source]
    pub source: KdbError,
}
