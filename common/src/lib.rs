//! Shared building blocks for the kdbws workspace.
//!
//! Nothing in here knows about kdb+ or WebSockets. The crate holds the pieces
//! every other crate leans on:
//!
//! - [`ErrorLocation`]: file/line/column captured at the error site
//! - [`RedactedSecret`]: credentials that never leak through `Debug` or logs

pub mod error;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;
