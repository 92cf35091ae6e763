//! Opening both sides of the bridge.
//!
//! Nothing here retries: a failed dial is fatal and the caller exits.

use crate::config::{KdbEndpoint, TargetEndpoint};
use crate::error::kdb::KdbError;
use crate::error::ws::WsError;
use crate::kdb::KdbConnection;

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, info};
use native_tls::TlsConnector;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};

/// The target connection as returned by the dialer.
pub type TargetStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn open_kdb(endpoint: &KdbEndpoint) -> Result<KdbConnection, KdbError> {
    info!(
        "Opening connection to kdb+ process at {}:{} ...",
        endpoint.host, endpoint.port
    );
    let connection =
        KdbConnection::dial(&endpoint.host, endpoint.port, endpoint.credentials.as_ref()).await?;
    info!(
        "Successfully connected to kdb+ process (capability {})",
        connection.capability()
    );
    Ok(connection)
}

/// Build the upgrade request, attaching `Authorization` when configured.
pub fn target_request(endpoint: &TargetEndpoint) -> Result<Request, WsError> {
    let mut request = endpoint
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| WsError::Request {
            message: format!("Invalid WebSocket request for {}: {e}", endpoint.url),
            location: ErrorLocation::from(Location::caller()),
        })?;

    if let Some(auth) = &endpoint.auth {
        let mut value =
            HeaderValue::from_str(&auth.header_value()).map_err(|e| WsError::Request {
                message: format!("Invalid Authorization header: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    Ok(request)
}

/// Dial the WebSocket target, over TLS when a connector is given.
pub async fn open_websocket(
    endpoint: &TargetEndpoint,
    tls: Option<TlsConnector>,
) -> Result<TargetStream, WsError> {
    let request = target_request(endpoint)?;

    info!("Connecting to WebSocket target at {}", endpoint.url);
    let connector = tls.map(Connector::NativeTls);
    let (stream, response) = connect_async_tls_with_config(request, None, false, connector)
        .await
        .map_err(|e| WsError::Dial {
            message: format!("Failed to connect to {}: {e}", endpoint.url),
            location: ErrorLocation::from(Location::caller()),
        })?;

    debug!("WebSocket upgrade answered with {}", response.status());
    info!("Successfully connected to WebSocket target");
    Ok(stream)
}
