pub mod callback;
pub mod config;
pub mod envelope;
pub mod fatal;
pub mod kdb;
pub mod relay;
pub mod tls;
pub mod ws;

pub use callback::CallbackError;
pub use config::ConfigError;
pub use envelope::EnvelopeError;
pub use fatal::FatalError;
pub use kdb::KdbError;
pub use relay::RelayError;
pub use tls::TlsError;
pub use ws::WsError;
