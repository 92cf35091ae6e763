//! One-way callback invocations sent to the kdb+ process.
//!
//! Each lifecycle event maps to a kdb+ function name from the configuration.
//! An invocation is the general list `("fname"; arg)` sent as an async IPC
//! message, which kdb+ evaluates as `fname[arg]` without replying. A callback
//! whose name is not configured is skipped.

use crate::config::CallbackNames;
use crate::error::callback::CallbackError;
use crate::kdb::{K, KdbWriter};

use std::fmt;

use log::{debug, error, info};
use tokio::io::AsyncWrite;

/// The five lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Both connections are open.
    Init,
    /// A payload arrived from the WebSocket target.
    Msg,
    /// A `message` call was forwarded to the target.
    Ack,
    /// A `message` call was refused or could not be forwarded.
    Error,
    /// The WebSocket target went away; the bridge is exiting.
    Close,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 5] = [
        CallbackKind::Init,
        CallbackKind::Msg,
        CallbackKind::Ack,
        CallbackKind::Error,
        CallbackKind::Close,
    ];

    /// Command-line flag that names this callback.
    pub fn flag(&self) -> &'static str {
        match self {
            CallbackKind::Init => "onInitCallback",
            CallbackKind::Msg => "onMsgCallback",
            CallbackKind::Ack => "onAckCallback",
            CallbackKind::Error => "onErrorCallback",
            CallbackKind::Close => "onCloseCallback",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Init => "Init",
            CallbackKind::Msg => "Msg",
            CallbackKind::Ack => "Ack",
            CallbackKind::Error => "Error",
            CallbackKind::Close => "Close",
        };
        f.write_str(name)
    }
}

/// Encode a callback invocation as `("fname"; arg)`.
pub fn invocation(name: &str, arg: K) -> K {
    K::List(vec![K::text(name), arg])
}

/// Sends callbacks over the write half of the kdb+ connection.
///
/// The emitter is the only writer on that connection.
pub struct CallbackEmitter<W> {
    writer: KdbWriter<W>,
    names: CallbackNames,
}

impl<W: AsyncWrite + Unpin> CallbackEmitter<W> {
    pub fn new(writer: KdbWriter<W>, names: CallbackNames) -> Self {
        Self { writer, names }
    }

    pub async fn send_init(&mut self) -> Result<(), CallbackError> {
        self.emit(CallbackKind::Init, K::Boolean(true)).await
    }

    /// Deliver a payload received from the target, byte for byte.
    pub async fn send_msg(&mut self, payload: &[u8]) -> Result<(), CallbackError> {
        self.emit(CallbackKind::Msg, K::text(payload)).await
    }

    pub async fn send_ack(&mut self) -> Result<(), CallbackError> {
        self.emit(CallbackKind::Ack, K::Boolean(true)).await
    }

    pub async fn send_close(&mut self) -> Result<(), CallbackError> {
        self.emit(CallbackKind::Close, K::Boolean(true)).await
    }

    /// Report `description` to kdb+ as an error object (signalled as `'description`).
    pub async fn send_error(&mut self, description: &str) -> Result<(), CallbackError> {
        self.emit(CallbackKind::Error, K::Error(description.to_string()))
            .await
    }

    pub fn is_enabled(&self, kind: CallbackKind) -> bool {
        self.names.name(kind).is_some()
    }

    async fn emit(&mut self, kind: CallbackKind, arg: K) -> Result<(), CallbackError> {
        let Some(name) = self.names.name(kind) else {
            debug!("{kind} callback not configured, skipping");
            return Ok(());
        };

        info!("Sending {kind} callback ({name}) to kdb+ process...");
        let message = invocation(name, arg);
        match self.writer.send_async(&message).await {
            Ok(()) => {
                info!("Successfully sent {kind} callback to kdb+");
                Ok(())
            }
            Err(source) => {
                error!("Fatal: error sending {kind} callback to kdb+ process: {source}");
                Err(CallbackError { kind, source })
            }
        }
    }
}
