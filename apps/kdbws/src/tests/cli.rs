// Unit tests for command-line parsing and conversion into the bridge config

use crate::cli::Cli;

use clap::Parser;
use clap::error::ErrorKind;

const REQUIRED: [&str; 7] = [
    "kdbws",
    "--kdbhost",
    "localhost",
    "--kdbport",
    "5001",
    "--wshost",
    "feed.example.com",
];

fn parse(extra: &[&str]) -> Cli {
    let args = REQUIRED.iter().chain(extra.iter()).copied();
    Cli::try_parse_from(args).expect("valid command line")
}

/// **VALUE**: Verifies the established camelCase and lowercase flag names are accepted.
///
/// **WHY THIS MATTERS**: Existing deployment scripts pass these exact spellings.
#[test]
fn given_established_flag_names_when_parsed_then_fields_are_set() {
    // GIVEN / WHEN
    let cli = parse(&[
        "--wspath",
        "stream",
        "--useTLS",
        "--tlskeyfile",
        "client.key",
        "--tlscertfile",
        "client.crt",
        "--proclogfile",
        "kdbws.log",
        "--onInitCallback",
        ".ws.init",
        "--onMsgCallback",
        ".ws.msg",
        "--onAckCallback",
        ".ws.ack",
        "--onErrorCallback",
        ".ws.err",
        "--onCloseCallback",
        ".ws.close",
    ]);

    // THEN
    assert_eq!(cli.kdb_host.as_deref(), Some("localhost"));
    assert_eq!(cli.kdb_port, Some(5001));
    assert_eq!(cli.ws_path.as_deref(), Some("stream"));
    assert!(cli.use_tls);
    assert_eq!(cli.on_error_callback.as_deref(), Some(".ws.err"));
    assert_eq!(
        cli.proc_log_file.as_deref(),
        Some(std::path::Path::new("kdbws.log"))
    );
}

/// **VALUE**: Verifies flags flow into a valid bridge configuration.
#[test]
fn given_complete_flags_when_converted_then_config_builds() {
    let cli = parse(&[
        "--wsauthtype",
        "Bearer",
        "--wsauth",
        "token",
        "--onMsgCallback",
        ".ws.msg",
    ]);

    let config = cli.into_builder().build().expect("valid config");

    assert_eq!(config.kdb.port, 5001);
    assert_eq!(config.target.url.as_str(), "ws://feed.example.com/");
    assert_eq!(config.callbacks.msg.as_deref(), Some(".ws.msg"));
    assert!(config.target.auth.is_some());
}

/// **VALUE**: Verifies missing flags reach config validation instead of clap.
///
/// **WHY THIS MATTERS**: Validation messages are part of the operator-facing contract
/// and must read the same however the flags were supplied.
#[test]
fn given_no_callbacks_when_converted_then_validation_rejects() {
    let cli = parse(&[]);

    let error = cli.into_builder().build().expect_err("no callbacks");

    assert!(error.to_string().contains("no kdb+ callbacks defined"));
}

#[test]
fn given_non_numeric_port_when_parsed_then_clap_rejects() {
    let result = Cli::try_parse_from(["kdbws", "--kdbport", "five"]);

    let error = result.expect_err("port must be numeric");
    assert_eq!(error.kind(), ErrorKind::ValueValidation);
}

#[test]
fn given_help_flag_when_parsed_then_reports_display_help() {
    let error = Cli::try_parse_from(["kdbws", "--help"]).expect_err("help is not a run");

    assert_eq!(error.kind(), ErrorKind::DisplayHelp);
}
