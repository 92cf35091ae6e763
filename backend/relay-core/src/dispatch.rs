//! The dispatch loop.
//!
//! A single task waits on four sources (kdb+ inbound unit, target inbound
//! payload, kdb+ read failure, target read failure). Queued data is always
//! handled before a failure, so nothing a listener read is lost.
//! It is the only writer on both connections, so writes never interleave and
//! nothing needs a lock.
//!
//! # States
//!
//! `Running` is the loop itself. Any fatal event ends it and the loop returns
//! the [`FatalError`] that describes the shutdown; there is no way back.
//!
//! | event | reaction | next |
//! |---|---|---|
//! | kdb+ read error | log | shutdown (no Close callback) |
//! | target read error | log, Close callback (best effort) | shutdown |
//! | kdb+ unit | validate, forward, Ack or Error callback | running |
//! | target payload | Msg callback | running |
//! | callback write error | log | shutdown |

use crate::callback::CallbackEmitter;
use crate::envelope::{self, Request};
use crate::error::callback::CallbackError;
use crate::error::fatal::FatalError;
use crate::error::kdb::KdbError;
use crate::error::relay::RelayError;
use crate::error::ws::WsError;
use crate::kdb::{KdbMessage, MessageKind};
use crate::listener::Inbound;

use common::ErrorLocation;

use std::ops::ControlFlow;
use std::panic::Location;

use bytes::Bytes;
use futures_util::{Sink, SinkExt};
use log::{error, info, warn};
use tokio::io::AsyncWrite;
use tokio_tungstenite::tungstenite::{Error as TungsteniteError, Message};

/// One thing the dispatch loop reacts to.
#[derive(Debug)]
pub enum Event {
    KdbReadFailed(KdbError),
    TargetReadFailed(WsError),
    FromKdb(KdbMessage),
    FromTarget(Bytes),
}

pub struct Dispatcher<W, T> {
    callbacks: CallbackEmitter<W>,
    target: T,
}

impl<W, T> Dispatcher<W, T>
where
    W: AsyncWrite + Unpin,
    T: Sink<Message, Error = TungsteniteError> + Unpin,
{
    /// `callbacks` owns the kdb+ write half, `target` the WebSocket write half.
    pub fn new(callbacks: CallbackEmitter<W>, target: T) -> Self {
        Self { callbacks, target }
    }

    /// Run until a fatal event and return it.
    pub async fn run(mut self, mut inbound: Inbound) -> FatalError {
        info!("Relay running");
        loop {
            // Queued data before failures: a listener reports its failure only
            // after everything it read is queued.
            let event = tokio::select! {
                biased;
                Some(message) = inbound.kdb.recv() => Event::FromKdb(message),
                Some(payload) = inbound.target.recv() => Event::FromTarget(payload),
                failure = &mut inbound.kdb_failure => Event::KdbReadFailed(
                    failure.unwrap_or_else(|_| KdbError::Closed {
                        message: String::from("kdb+ listener stopped unexpectedly"),
                        location: ErrorLocation::from(Location::caller()),
                    }),
                ),
                failure = &mut inbound.target_failure => Event::TargetReadFailed(
                    failure.unwrap_or_else(|_| WsError::Closed {
                        message: String::from("WebSocket listener stopped unexpectedly"),
                        location: ErrorLocation::from(Location::caller()),
                    }),
                ),
            };

            if let ControlFlow::Break(fatal) = self.handle(event).await {
                return fatal;
            }
        }
    }

    /// Apply one event. `Break` means the bridge must shut down.
    pub async fn handle(&mut self, event: Event) -> ControlFlow<FatalError> {
        match event {
            Event::KdbReadFailed(e) => {
                error!("Fatal: error reading from kdb+ handle: {e}");
                ControlFlow::Break(FatalError::KdbRead(e))
            }
            Event::TargetReadFailed(e) => {
                error!("Fatal: error reading from WebSocket handle: {e}");
                if let Err(close_error) = self.callbacks.send_close().await {
                    error!("Close callback could not be delivered: {close_error}");
                }
                ControlFlow::Break(FatalError::TargetRead(e))
            }
            Event::FromKdb(message) => self.relay_to_target(message).await,
            Event::FromTarget(payload) => self.relay_to_kdb(&payload).await,
        }
    }

    async fn relay_to_target(&mut self, message: KdbMessage) -> ControlFlow<FatalError> {
        if message.kind == MessageKind::Sync {
            warn!("Received sync request from kdb+; it will not be answered, use an async call");
        }

        let outcome = match envelope::parse_request(&message.value) {
            Ok(Request::Message(text)) => self.forward(text).await,
            Err(e) => {
                error!("Received unsupported ({e}) message from kdb+: {e:?}");
                Err(RelayError::from(e))
            }
        };

        let delivered = match outcome {
            Ok(()) => self.callbacks.send_ack().await,
            Err(e) => self.callbacks.send_error(&e.to_string()).await,
        };
        fatal_on_callback_failure(delivered)
    }

    async fn relay_to_kdb(&mut self, payload: &[u8]) -> ControlFlow<FatalError> {
        info!("Received {} bytes from WebSocket target", payload.len());
        fatal_on_callback_failure(self.callbacks.send_msg(payload).await)
    }

    /// Write `text` to the target as one text frame.
    ///
    /// A failed write is reported to kdb+ but does not stop the relay; a dead
    /// socket surfaces separately as a target read error.
    async fn forward(&mut self, text: &str) -> Result<(), RelayError> {
        info!("\"message\" method called from kdb+, sending data to WebSocket target...");
        match self.target.send(Message::text(text.to_owned())).await {
            Ok(()) => {
                info!("Successfully sent data to WebSocket target");
                Ok(())
            }
            Err(e) => {
                error!("Error sending data to WebSocket target: {e}");
                Err(RelayError::Forward(e))
            }
        }
    }
}

fn fatal_on_callback_failure(result: Result<(), CallbackError>) -> ControlFlow<FatalError> {
    match result {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => ControlFlow::Break(FatalError::Callback(e)),
    }
}
