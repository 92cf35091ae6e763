// Integration tests for the kdbws binary.
// These run the built executable and check its exit codes and log output.

mod exit_codes;
