use thiserror::Error as ThisError;

/// Why an inbound kdb+ unit was refused.
///
/// The `Display` text is exactly what the Error callback delivers to the kdb+
/// process, so it carries no location suffix.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EnvelopeError {
    /// Not a general list; carries the offending type code.
    #[error("object-type")]
    ObjectType { type_code: i8 },

    #[error("object-length")]
    ObjectLength { len: usize },

    #[error("method-type")]
    MethodType { type_code: i8 },

    #[error("message-type")]
    MessageType { type_code: i8 },

    /// Payload of a `message` call that is not valid UTF-8 and so cannot be a
    /// WebSocket text frame.
    #[error("message-encoding")]
    MessageEncoding,

    #[error("unsupported method")]
    UnsupportedMethod { method: String },
}
