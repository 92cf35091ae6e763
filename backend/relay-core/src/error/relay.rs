use crate::error::envelope::EnvelopeError;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;

/// Per-message failure of a database-originated request.
///
/// Recoverable: reported through the Error callback, the relay keeps running.
/// `Display` is the description delivered to kdb+.
#[derive(Debug, ThisError)]
pub enum RelayError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Forward(#[from] TungsteniteError),
}
