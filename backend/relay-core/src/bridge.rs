//! Wiring: connect both sides, announce readiness, relay until fatal.

use crate::callback::CallbackEmitter;
use crate::config::BridgeConfig;
use crate::connect::{open_kdb, open_websocket};
use crate::dispatch::Dispatcher;
use crate::error::fatal::FatalError;
use crate::listener::spawn_listeners;

use futures_util::StreamExt;
use log::error;
use native_tls::TlsConnector;

/// Run the bridge described by `config`.
///
/// Never returns while the relay is healthy: the returned value is the reason
/// it stopped. `tls` is the connector for `wss://` targets, loaded beforehand
/// so that TLS problems are reported before anything is dialed.
pub async fn run_bridge(config: &BridgeConfig, tls: Option<TlsConnector>) -> FatalError {
    let kdb = match open_kdb(&config.kdb).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Fatal: error connecting to kdb+ process: {e}");
            return FatalError::KdbDial(e);
        }
    };

    let target = match open_websocket(&config.target, tls).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Fatal: error connecting to WebSocket target: {e}");
            return FatalError::WsDial(e);
        }
    };

    let (kdb_reader, kdb_writer) = kdb.into_split();
    let mut callbacks = CallbackEmitter::new(kdb_writer, config.callbacks.clone());
    if let Err(e) = callbacks.send_init().await {
        return FatalError::Callback(e);
    }

    let (target_sink, target_stream) = target.split();
    let (inbound, listeners) = spawn_listeners(kdb_reader, target_stream);

    let fatal = Dispatcher::new(callbacks, target_sink).run(inbound).await;
    listeners.abort();
    fatal
}
