use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("TLS Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS Identity Error: {reason} {location}")]
    Identity {
        location: ErrorLocation,
        reason: String,
    },

    #[error("TLS Connector Error: {reason} {location}")]
    Connector {
        location: ErrorLocation,
        reason: String,
    },
}
