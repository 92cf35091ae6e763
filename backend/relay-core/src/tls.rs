//! Client TLS identity for `wss://` targets.

use crate::config::TlsFiles;
use crate::error::tls::TlsError;

use common::ErrorLocation;

use std::fs;
use std::panic::Location;
use std::path::Path;

use log::info;
use native_tls::{Identity, TlsConnector};

/// Load the PEM certificate chain and PKCS#8 private key and build a
/// connector presenting them as the client identity.
///
/// # Errors
///
/// - [`TlsError::Read`] if either file cannot be read
/// - [`TlsError::Identity`] if the pair does not form a valid identity
/// - [`TlsError::Connector`] if the platform TLS backend refuses the identity
pub fn load_connector(files: &TlsFiles) -> Result<TlsConnector, TlsError> {
    info!("Loading TLS Certificate and Key...");
    let cert = read_pem(&files.cert)?;
    let key = read_pem(&files.key)?;

    let identity = Identity::from_pkcs8(&cert, &key).map_err(|e| TlsError::Identity {
        reason: format!("Failed to build identity from certificate and key: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let connector = TlsConnector::builder()
        .identity(identity)
        .build()
        .map_err(|e| TlsError::Connector {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Successfully loaded TLS Certificate and Key");
    Ok(connector)
}

#[track_caller]
fn read_pem(path: &Path) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    })
}
