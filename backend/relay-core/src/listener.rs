//! The two read loops.
//!
//! Each listener exclusively owns the read side of one connection, pushes every
//! unit it reads onto its exchange queue, and on the first read error reports
//! that error once and ends. Neither listener closes its connection; shutdown
//! belongs to the dispatch loop.

use crate::error::kdb::KdbError;
use crate::error::ws::WsError;
use crate::kdb::{KdbMessage, KdbReader};

use common::ErrorLocation;

use std::panic::Location;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as TungsteniteError, Message};

/// Receiving ends of both exchange queues and both error channels, consumed by
/// the dispatch loop.
pub struct Inbound {
    pub kdb: mpsc::UnboundedReceiver<KdbMessage>,
    pub target: mpsc::UnboundedReceiver<Bytes>,
    pub kdb_failure: oneshot::Receiver<KdbError>,
    pub target_failure: oneshot::Receiver<WsError>,
}

/// Handles of the running listener tasks.
pub struct Listeners {
    kdb: JoinHandle<()>,
    target: JoinHandle<()>,
}

impl Listeners {
    /// Abandon both reads. Used once the dispatch loop has decided to exit.
    pub fn abort(&self) {
        self.kdb.abort();
        self.target.abort();
    }
}

/// Start both listeners and return the queues they feed.
pub fn spawn_listeners<R, S>(kdb: KdbReader<R>, target: S) -> (Inbound, Listeners)
where
    R: AsyncRead + Unpin + Send + 'static,
    S: Stream<Item = Result<Message, TungsteniteError>> + Unpin + Send + 'static,
{
    let (kdb_tx, kdb_rx) = mpsc::unbounded_channel();
    let (target_tx, target_rx) = mpsc::unbounded_channel();
    let (kdb_failure_tx, kdb_failure_rx) = oneshot::channel();
    let (target_failure_tx, target_failure_rx) = oneshot::channel();

    let listeners = Listeners {
        kdb: spawn_kdb_listener(kdb, kdb_tx, kdb_failure_tx),
        target: spawn_target_listener(target, target_tx, target_failure_tx),
    };

    let inbound = Inbound {
        kdb: kdb_rx,
        target: target_rx,
        kdb_failure: kdb_failure_rx,
        target_failure: target_failure_rx,
    };

    (inbound, listeners)
}

pub fn spawn_kdb_listener<R>(
    mut reader: KdbReader<R>,
    inbound: mpsc::UnboundedSender<KdbMessage>,
    failure: oneshot::Sender<KdbError>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        info!("kdb+ listener started");
        loop {
            match reader.read_message().await {
                Ok(message) => {
                    if inbound.send(message).is_err() {
                        debug!("Dispatch loop gone, kdb+ listener stopping");
                        return;
                    }
                }
                Err(e) => {
                    let _ = failure.send(e);
                    return;
                }
            }
        }
    })
}

pub fn spawn_target_listener<S>(
    mut stream: S,
    inbound: mpsc::UnboundedSender<Bytes>,
    failure: oneshot::Sender<WsError>,
) -> JoinHandle<()>
where
    S: Stream<Item = Result<Message, TungsteniteError>> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        info!("WebSocket listener started");
        let error = loop {
            match stream.next().await {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    if inbound.send(message.into_data()).is_err() {
                        debug!("Dispatch loop gone, WebSocket listener stopping");
                        return;
                    }
                }
                // Control frames; pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    break WsError::Closed {
                        message: match frame {
                            Some(frame) => format!(
                                "Target sent close frame ({}): {}",
                                u16::from(frame.code),
                                frame.reason.as_str()
                            ),
                            None => String::from("Target sent close frame"),
                        },
                        location: ErrorLocation::from(Location::caller()),
                    };
                }
                Some(Err(e)) => {
                    break WsError::Read {
                        message: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    };
                }
                None => {
                    break WsError::Closed {
                        message: String::from("Target closed the connection"),
                        location: ErrorLocation::from(Location::caller()),
                    };
                }
            }
        };
        let _ = failure.send(error);
    })
}
