//! Relay engine between a kdb+ process and a WebSocket target.
//!
//! - [`kdb`]: kdb+ IPC codec and connection
//! - [`envelope`]: validation of `(method; payload)` units from kdb+
//! - [`callback`]: one-way lifecycle callbacks to kdb+
//! - [`listener`]: the two read loops
//! - [`dispatch`]: the loop that routes between both sides and decides shutdown
//! - [`bridge`]: connects everything for the binary
//!
//! The binary crate stays thin: it parses flags, sets up logging, and maps the
//! [`FatalError`](error::FatalError) returned by [`run_bridge`] to an exit code.

pub mod bridge;
pub mod callback;
pub mod config;
pub mod connect;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod kdb;
pub mod listener;
pub mod tls;

#[cfg(test)]
mod tests;

pub use bridge::run_bridge;
