use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Validation Error: {reason} {location}")]
    Validation {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config File Not Found Error: {path}: {reason} {location}")]
    FileNotFound {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Config Url Error: {url}: {reason} {location}")]
    Url {
        location: ErrorLocation,
        url: String,
        reason: String,
    },
}
