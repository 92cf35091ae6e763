// Unit tests for relay-core internals.
// End-to-end tests over real sockets live in integration_tests/.

mod kdb;
mod support;
