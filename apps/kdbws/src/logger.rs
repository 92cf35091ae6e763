//! Process logging.
//!
//! With `--proclogfile` every record goes to that file (created if missing,
//! appended otherwise). Without it nothing is logged. Initialization runs once
//! per process; the returned [`LogGuard`] flushes the sink when dropped.

use crate::error::KdbWsError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Message logged when logger is successfully initialized.
const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

/// Warning message when logger is called multiple times.
const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Default log level for debug builds.
#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Default log level for release builds.
#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Flushes the installed logger when dropped.
///
/// Keep it alive until the exit code is known so the last `Fatal:` line
/// reaches the file.
#[must_use = "dropping the guard flushes the log immediately"]
#[derive(Debug)]
pub struct LogGuard {
    _private: (),
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

/// Initialize logging into `log_file`, or disable it when `None`.
///
/// Safe to call more than once: later calls log a warning and keep the first
/// configuration.
///
/// # Errors
///
/// Returns [`KdbWsError::LogFile`] if:
/// - The log file cannot be opened
/// - Another logger is already installed
pub fn initialize(log_file: Option<&Path>) -> Result<LogGuard, KdbWsError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(LogGuard { _private: () });
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = match log_file {
            Some(path) => initialize_file(path),
            None => initialize_disabled(),
        };
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{:?}", log::max_level());
        }
    });

    result.map(|()| LogGuard { _private: () })
}

/// Plain-text file dispatch.
#[track_caller]
fn initialize_file(path: &Path) -> Result<(), KdbWsError> {
    let file = fern::log_file(path).map_err(|e| KdbWsError::LogFile {
        message: format!("Failed to open log file {}: {e}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Dispatch::new()
        .level(LOG_LEVEL)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(file)
        .apply()
        .map_err(|e| KdbWsError::LogFile {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// Null sink: every record is filtered out.
#[track_caller]
fn initialize_disabled() -> Result<(), KdbWsError> {
    Dispatch::new()
        .level(LevelFilter::Off)
        .apply()
        .map_err(|e| KdbWsError::LogFile {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
