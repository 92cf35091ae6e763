//! Bridge configuration.
//!
//! Raw command-line values go into [`BridgeConfigBuilder`]; [`BridgeConfigBuilder::build`]
//! validates them once and produces an immutable [`BridgeConfig`] that is
//! passed by reference to every component for the lifetime of the process.

use crate::callback::CallbackKind;
use crate::error::config::ConfigError;

use common::{ErrorLocation, RedactedSecret};

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::info;
use url::Url;

const WS_SCHEME: &str = "ws";
const WSS_SCHEME: &str = "wss";

// ============================================
// TARGET AUTH
// ============================================

/// Scheme of the `Authorization` header sent to the WebSocket target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = ConfigError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Basic" => Ok(AuthScheme::Basic),
            "Bearer" => Ok(AuthScheme::Bearer),
            _ => Err(ConfigError::Validation {
                reason: String::from("wsauthtype unsupported (only Bearer or Basic auth supported)"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetAuth {
    pub scheme: AuthScheme,
    pub credential: RedactedSecret,
}

impl TargetAuth {
    /// `Authorization` header value: the scheme followed by the base64 of the
    /// credential, for both schemes.
    pub fn header_value(&self) -> String {
        format!(
            "{} {}",
            self.scheme,
            BASE64.encode(self.credential.expose().as_bytes())
        )
    }
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct KdbEndpoint {
    pub host: String,
    pub port: u16,
    pub credentials: Option<RedactedSecret>,
}

#[derive(Debug, Clone)]
pub struct TargetEndpoint {
    /// `ws://` or `wss://` URL built from host and path.
    pub url: Url,
    pub tls: Option<TlsFiles>,
    pub auth: Option<TargetAuth>,
}

/// kdb+ function names invoked for each lifecycle event. `None` disables the
/// callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackNames {
    pub init: Option<String>,
    pub msg: Option<String>,
    pub ack: Option<String>,
    pub error: Option<String>,
    pub close: Option<String>,
}

impl CallbackNames {
    pub fn name(&self, kind: CallbackKind) -> Option<&str> {
        match kind {
            CallbackKind::Init => self.init.as_deref(),
            CallbackKind::Msg => self.msg.as_deref(),
            CallbackKind::Ack => self.ack.as_deref(),
            CallbackKind::Error => self.error.as_deref(),
            CallbackKind::Close => self.close.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub kdb: KdbEndpoint,
    pub target: TargetEndpoint,
    pub callbacks: CallbackNames,
    pub log_file: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Write the parsed configuration to the log. Secrets only show whether
    /// they are set.
    pub fn log_summary(&self) {
        info!("Parsed command line arguments");
        info!("kdbhost: {}", self.kdb.host);
        info!("kdbport: {}", self.kdb.port);
        info!("kdbauth: {}", defined(self.kdb.credentials.is_some()));
        info!("wsurl: {}", self.target.url);
        match &self.target.auth {
            Some(auth) => info!("wsauthtype: {}, wsauth: defined", auth.scheme),
            None => info!("wsauth: undefined"),
        }
        info!("useTLS: {}", self.target.tls.is_some());
        if let Some(tls) = &self.target.tls {
            info!("tlskeyfile: {}", tls.key.display());
            info!("tlscertfile: {}", tls.cert.display());
        }
        for kind in CallbackKind::ALL {
            if let Some(name) = self.callbacks.name(kind) {
                info!("{}: {name}", kind.flag());
            }
        }
    }
}

fn defined(present: bool) -> &'static str {
    if present { "defined" } else { "undefined" }
}

// ============================================
// BUILDER
// ============================================

/// Collects raw flag values. Empty strings count as "not set".
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    kdb_host: Option<String>,
    kdb_port: Option<u16>,
    kdb_auth: Option<RedactedSecret>,
    ws_host: Option<String>,
    ws_path: Option<String>,
    ws_auth_type: Option<String>,
    ws_auth: Option<RedactedSecret>,
    use_tls: bool,
    tls_key_file: Option<PathBuf>,
    tls_cert_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
    callbacks: CallbackNames,
}

impl BridgeConfigBuilder {
    pub fn with_kdb_host(mut self, host: impl Into<String>) -> Self {
        self.kdb_host = non_empty(host);
        self
    }

    pub fn with_kdb_port(mut self, port: u16) -> Self {
        self.kdb_port = Some(port);
        self
    }

    pub fn with_kdb_auth(mut self, auth: impl Into<String>) -> Self {
        self.kdb_auth = RedactedSecret::non_empty(auth);
        self
    }

    pub fn with_ws_host(mut self, host: impl Into<String>) -> Self {
        self.ws_host = non_empty(host);
        self
    }

    pub fn with_ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = non_empty(path);
        self
    }

    pub fn with_ws_auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.ws_auth_type = non_empty(auth_type);
        self
    }

    pub fn with_ws_auth(mut self, auth: impl Into<String>) -> Self {
        self.ws_auth = RedactedSecret::non_empty(auth);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_tls_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_key_file = non_empty_path(path.into());
        self
    }

    pub fn with_tls_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_cert_file = non_empty_path(path.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = non_empty_path(path.into());
        self
    }

    pub fn with_callback(mut self, kind: CallbackKind, name: impl Into<String>) -> Self {
        let name = non_empty(name);
        match kind {
            CallbackKind::Init => self.callbacks.init = name,
            CallbackKind::Msg => self.callbacks.msg = name,
            CallbackKind::Ack => self.callbacks.ack = name,
            CallbackKind::Error => self.callbacks.error = name,
            CallbackKind::Close => self.callbacks.close = name,
        }
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    #[track_caller]
    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        let Some(kdb_host) = self.kdb_host else {
            return Err(validation("kdbhost flag not defined"));
        };

        let Some(kdb_port) = self.kdb_port.filter(|port| *port != 0) else {
            return Err(validation("kdbport flag not defined or is 0"));
        };

        let Some(ws_host) = self.ws_host else {
            return Err(validation("wshost flag not defined"));
        };

        let tls = if self.use_tls {
            let Some(key) = self.tls_key_file else {
                return Err(validation(
                    "useTLS flag is provided but tlskeyfile is not defined",
                ));
            };
            let Some(cert) = self.tls_cert_file else {
                return Err(validation(
                    "useTLS flag is provided but tlscertfile is not defined",
                ));
            };
            Some(TlsFiles { cert, key })
        } else {
            None
        };

        let callbacks = self.callbacks;
        if callbacks.init.is_none() && callbacks.msg.is_none() && callbacks.close.is_none() {
            return Err(validation(
                "no kdb+ callbacks defined; at least one of the following must be defined: onInitCallback, onMsgCallback, onCloseCallback",
            ));
        }

        let auth = match (self.ws_auth_type, self.ws_auth) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(validation("wsauthtype is provided but no wsauth is defined"));
            }
            (None, Some(_)) => {
                return Err(validation("wsauth is provided but no wsauthtype is defined"));
            }
            (Some(scheme), Some(credential)) => Some(TargetAuth {
                scheme: AuthScheme::from_str(&scheme)?,
                credential,
            }),
        };

        if let Some(files) = &tls {
            require_file(&files.key, "tlskeyfile")?;
            require_file(&files.cert, "tlscertfile")?;
        }

        let url = target_url(&ws_host, self.ws_path.as_deref(), tls.is_some())?;

        Ok(BridgeConfig {
            kdb: KdbEndpoint {
                host: kdb_host,
                port: kdb_port,
                credentials: self.kdb_auth,
            },
            target: TargetEndpoint { url, tls, auth },
            callbacks,
            log_file: self.log_file,
        })
    }
}

/// Build `ws://host/path` (or `wss://` with TLS).
#[track_caller]
pub fn target_url(host: &str, path: Option<&str>, secure: bool) -> Result<Url, ConfigError> {
    let location = ErrorLocation::from(Location::caller());
    let scheme = if secure { WSS_SCHEME } else { WS_SCHEME };
    let path = match path {
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{p}"),
        None => String::new(),
    };
    let raw = format!("{scheme}://{host}{path}");

    let url = match Url::parse(&raw) {
        Ok(url) => url,
        Err(e) => {
            return Err(ConfigError::Url {
                url: raw,
                reason: e.to_string(),
                location,
            });
        }
    };

    if url.host_str().is_none() {
        return Err(ConfigError::Url {
            url: raw,
            reason: String::from("missing host"),
            location,
        });
    }

    Ok(url)
}

#[track_caller]
fn validation(reason: &str) -> ConfigError {
    ConfigError::Validation {
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn require_file(path: &Path, flag: &str) -> Result<(), ConfigError> {
    if path.is_file() {
        return Ok(());
    }
    Err(ConfigError::FileNotFound {
        path: path.to_path_buf(),
        reason: format!("{flag} file does not exist"),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.is_empty() { None } else { Some(value) }
}

fn non_empty_path(path: PathBuf) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}
