//! Command-line flags.
//!
//! Flag names match the ones existing deployments already pass. Everything is
//! optional at the clap level so that missing or inconsistent values are
//! reported by [`BridgeConfigBuilder::build`] with the same messages whether
//! they come from flags or the environment.

use relay_core::callback::CallbackKind;
use relay_core::config::{BridgeConfig, BridgeConfigBuilder};

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "kdbws")]
#[command(about = "Relay between a kdb+ process and a WebSocket server")]
#[command(version)]
pub struct Cli {
    /// Host of the kdb+ process
    #[arg(long = "kdbhost", value_name = "HOST")]
    pub kdb_host: Option<String>,

    /// Port of the kdb+ process
    #[arg(long = "kdbport", value_name = "PORT")]
    pub kdb_port: Option<u16>,

    /// kdb+ credentials as user:password
    #[arg(long = "kdbauth", env = "KDBWS_KDBAUTH", hide_env_values = true)]
    pub kdb_auth: Option<String>,

    /// WebSocket host, optionally with :port
    #[arg(long = "wshost", value_name = "HOST[:PORT]")]
    pub ws_host: Option<String>,

    /// WebSocket path
    #[arg(long = "wspath", value_name = "PATH")]
    pub ws_path: Option<String>,

    /// Authorization scheme for the WebSocket upgrade (Basic or Bearer)
    #[arg(long = "wsauthtype", value_name = "SCHEME")]
    pub ws_auth_type: Option<String>,

    /// Credential for the WebSocket Authorization header
    #[arg(long = "wsauth", env = "KDBWS_WSAUTH", hide_env_values = true)]
    pub ws_auth: Option<String>,

    /// Connect to the target over wss:// with a client certificate
    #[arg(long = "useTLS")]
    pub use_tls: bool,

    /// PEM file holding the PKCS#8 client key
    #[arg(long = "tlskeyfile", value_name = "FILE")]
    pub tls_key_file: Option<PathBuf>,

    /// PEM file holding the client certificate chain
    #[arg(long = "tlscertfile", value_name = "FILE")]
    pub tls_cert_file: Option<PathBuf>,

    /// Log file; logging is disabled without it
    #[arg(long = "proclogfile", value_name = "FILE")]
    pub proc_log_file: Option<PathBuf>,

    /// kdb+ function called once both connections are open
    #[arg(long = "onInitCallback", value_name = "FUNCTION")]
    pub on_init_callback: Option<String>,

    /// kdb+ function called with each payload from the target
    #[arg(long = "onMsgCallback", value_name = "FUNCTION")]
    pub on_msg_callback: Option<String>,

    /// kdb+ function called after a message was sent to the target
    #[arg(long = "onAckCallback", value_name = "FUNCTION")]
    pub on_ack_callback: Option<String>,

    /// kdb+ function called when a message could not be sent
    #[arg(long = "onErrorCallback", value_name = "FUNCTION")]
    pub on_error_callback: Option<String>,

    /// kdb+ function called when the target connection ends
    #[arg(long = "onCloseCallback", value_name = "FUNCTION")]
    pub on_close_callback: Option<String>,
}

impl Cli {
    /// Move every flag into a config builder.
    pub fn into_builder(self) -> BridgeConfigBuilder {
        let mut builder = BridgeConfig::builder().with_tls(self.use_tls);

        if let Some(host) = self.kdb_host {
            builder = builder.with_kdb_host(host);
        }
        if let Some(port) = self.kdb_port {
            builder = builder.with_kdb_port(port);
        }
        if let Some(auth) = self.kdb_auth {
            builder = builder.with_kdb_auth(auth);
        }
        if let Some(host) = self.ws_host {
            builder = builder.with_ws_host(host);
        }
        if let Some(path) = self.ws_path {
            builder = builder.with_ws_path(path);
        }
        if let Some(auth_type) = self.ws_auth_type {
            builder = builder.with_ws_auth_type(auth_type);
        }
        if let Some(auth) = self.ws_auth {
            builder = builder.with_ws_auth(auth);
        }
        if let Some(path) = self.tls_key_file {
            builder = builder.with_tls_key_file(path);
        }
        if let Some(path) = self.tls_cert_file {
            builder = builder.with_tls_cert_file(path);
        }
        if let Some(path) = self.proc_log_file {
            builder = builder.with_log_file(path);
        }

        let callbacks = [
            (CallbackKind::Init, self.on_init_callback),
            (CallbackKind::Msg, self.on_msg_callback),
            (CallbackKind::Ack, self.on_ack_callback),
            (CallbackKind::Error, self.on_error_callback),
            (CallbackKind::Close, self.on_close_callback),
        ];
        for (kind, name) in callbacks {
            if let Some(name) = name {
                builder = builder.with_callback(kind, name);
            }
        }

        builder
    }
}
