use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum KdbError {
    #[error("Dial Error: {message} {location}")]
    Dial {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connection Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },
}

impl KdbError {
    #[track_caller]
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        KdbError::Decode {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for KdbError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match error.kind() {
            ErrorKind::UnexpectedEof => KdbError::Closed {
                message: String::from("kdb+ process closed the connection"),
                location,
            },
            _ => KdbError::Io {
                message: error.to_string(),
                location,
            },
        }
    }
}
