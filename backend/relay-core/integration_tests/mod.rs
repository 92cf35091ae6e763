// Integration tests for relay-core.
// These run the bridge against a fake kdb+ process and a WebSocket server on
// loopback sockets.

mod bridge_tests;
mod error;
