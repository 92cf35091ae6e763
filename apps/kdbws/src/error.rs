use common::ErrorLocation;
use relay_core::callback::CallbackKind;
use relay_core::error::{ConfigError, FatalError, TlsError};

use thiserror::Error;

/// Process exit codes, one per failure class.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const LOG_FILE: u8 = 3;
    pub const CONFIG: u8 = 4;
    pub const TLS: u8 = 5;
    pub const KDB_DIAL: u8 = 6;
    pub const WS_DIAL: u8 = 7;
    pub const WS_READ: u8 = 8;
    pub const KDB_READ: u8 = 9;
    pub const INIT_CALLBACK: u8 = 10;
    pub const MSG_CALLBACK: u8 = 11;
    pub const ACK_CALLBACK: u8 = 12;
    pub const CLOSE_CALLBACK: u8 = 13;
    pub const ERROR_CALLBACK: u8 = 14;
    pub const RUNTIME: u8 = 15;
}

/// Everything that ends the `kdbws` process.
#[derive(Debug, Error)]
pub enum KdbWsError {
    /// Log file could not be opened or the logger could not be installed
    #[error("Log File Error: {message} {location}")]
    LogFile {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The async runtime could not be built
    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Relay(#[from] FatalError),
}

impl KdbWsError {
    pub fn exit_code(&self) -> u8 {
        match self {
            KdbWsError::LogFile { .. } => exit_code::LOG_FILE,
            KdbWsError::Config(_) => exit_code::CONFIG,
            KdbWsError::Tls(_) => exit_code::TLS,
            KdbWsError::Runtime { .. } => exit_code::RUNTIME,
            KdbWsError::Relay(fatal) => match fatal {
                FatalError::KdbDial(_) => exit_code::KDB_DIAL,
                FatalError::WsDial(_) => exit_code::WS_DIAL,
                FatalError::TargetRead(_) => exit_code::WS_READ,
                FatalError::KdbRead(_) => exit_code::KDB_READ,
                FatalError::Callback(e) => match e.kind {
                    CallbackKind::Init => exit_code::INIT_CALLBACK,
                    CallbackKind::Msg => exit_code::MSG_CALLBACK,
                    CallbackKind::Ack => exit_code::ACK_CALLBACK,
                    CallbackKind::Close => exit_code::CLOSE_CALLBACK,
                    CallbackKind::Error => exit_code::ERROR_CALLBACK,
                },
            },
        }
    }
}
