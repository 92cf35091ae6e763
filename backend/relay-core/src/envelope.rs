//! Validation of inbound kdb+ units.
//!
//! The only shape the bridge accepts from the database side is a two-element
//! general list `(method; payload)` where `method` is a symbol atom and
//! `payload` a char vector, e.g. `(`message; "hello")`. Everything else is a
//! protocol error reported back through the Error callback. Nothing here does
//! I/O.

use crate::error::envelope::EnvelopeError;
use crate::kdb::K;

/// Method name of the one supported relay call.
pub const MESSAGE_METHOD: &str = "message";

/// A validated `(method; payload)` pair, borrowed from the decoded unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub method: &'a str,
    pub payload: &'a [u8],
}

/// What the database side asked the bridge to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// Send `payload` to the WebSocket target as a text frame.
    Message(&'a str),
}

/// Check the shape of `unit`, failing on the first mismatch:
///
/// 1. general list, else [`EnvelopeError::ObjectType`]
/// 2. exactly two elements, else [`EnvelopeError::ObjectLength`]
/// 3. first element a symbol atom, else [`EnvelopeError::MethodType`]
/// 4. second element a char vector, else [`EnvelopeError::MessageType`]
pub fn validate(unit: &K) -> Result<Envelope<'_>, EnvelopeError> {
    let items = match unit {
        K::List(items) => items,
        other => {
            return Err(EnvelopeError::ObjectType {
                type_code: other.type_code(),
            });
        }
    };

    let [method, payload] = items.as_slice() else {
        return Err(EnvelopeError::ObjectLength { len: items.len() });
    };

    let method = match method {
        K::Symbol(name) => name.as_str(),
        other => {
            return Err(EnvelopeError::MethodType {
                type_code: other.type_code(),
            });
        }
    };

    let payload = match payload {
        K::Text(bytes) => bytes.as_slice(),
        other => {
            return Err(EnvelopeError::MessageType {
                type_code: other.type_code(),
            });
        }
    };

    Ok(Envelope { method, payload })
}

impl<'a> Envelope<'a> {
    /// Resolve the method name into a [`Request`].
    pub fn request(&self) -> Result<Request<'a>, EnvelopeError> {
        match self.method {
            MESSAGE_METHOD => std::str::from_utf8(self.payload)
                .map(Request::Message)
                .map_err(|_| EnvelopeError::MessageEncoding),
            other => Err(EnvelopeError::UnsupportedMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// [`validate`] followed by [`Envelope::request`].
pub fn parse_request(unit: &K) -> Result<Request<'_>, EnvelopeError> {
    validate(unit)?.request()
}
