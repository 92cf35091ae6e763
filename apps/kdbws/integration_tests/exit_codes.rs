use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;

use tempfile::TempDir;

/// Run the binary with `args` and no credentials from the environment.
fn kdbws(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kdbws"))
        .args(args)
        .env_remove("KDBWS_KDBAUTH")
        .env_remove("KDBWS_WSAUTH")
        .output()
        .expect("Failed to run kdbws")
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("kdbws was killed by a signal")
}

/// A loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn read_log(path: &Path) -> String {
    fs::read_to_string(path).expect("Failed to read log file")
}

/// **VALUE**: Verifies `--help` is a successful run, not a usage error.
#[test]
fn given_help_flag_when_run_then_exits_zero_with_usage() {
    let output = kdbws(&["--help"]);

    assert_eq!(exit_code(&output), 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--kdbhost"));
    assert!(stdout.contains("--onInitCallback"));
}

/// **VALUE**: Verifies config validation failures exit with code 4 and are logged.
///
/// **WHY THIS MATTERS**: The log file is the only place an operator sees why a
/// supervised bridge refused to start.
#[test]
fn given_missing_kdbhost_when_run_then_exits_four_and_logs_reason() {
    // GIVEN
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("kdbws.log");

    // WHEN
    let output = kdbws(&["--proclogfile", log.to_str().expect("utf-8 path")]);

    // THEN
    assert_eq!(exit_code(&output), 4);
    let contents = read_log(&log);
    assert!(contents.contains("kdbhost flag not defined"));
    assert!(contents.contains("Fatal:"));
}

#[test]
fn given_unknown_flag_when_run_then_exits_four() {
    let output = kdbws(&["--no-such-flag"]);

    assert_eq!(exit_code(&output), 4);
}

/// **VALUE**: Verifies an unopenable log file exits with code 3.
#[test]
fn given_log_file_in_missing_directory_when_run_then_exits_three() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("missing").join("kdbws.log");

    let output = kdbws(&["--proclogfile", log.to_str().expect("utf-8 path")]);

    assert_eq!(exit_code(&output), 3);
}

/// **VALUE**: Verifies unusable TLS material exits with code 5 before dialing.
#[test]
fn given_invalid_tls_files_when_run_then_exits_five() {
    // GIVEN
    let dir = TempDir::new().expect("temp dir");
    let key = dir.path().join("client.key");
    let cert = dir.path().join("client.crt");
    fs::write(&key, "not a key").expect("key file");
    fs::write(&cert, "not a certificate").expect("cert file");
    let kdb_port = closed_port().to_string();

    // WHEN
    let output = kdbws(&[
        "--kdbhost",
        "127.0.0.1",
        "--kdbport",
        &kdb_port,
        "--wshost",
        "127.0.0.1:1",
        "--useTLS",
        "--tlskeyfile",
        key.to_str().expect("utf-8 path"),
        "--tlscertfile",
        cert.to_str().expect("utf-8 path"),
        "--onMsgCallback",
        ".ws.msg",
    ]);

    // THEN
    assert_eq!(exit_code(&output), 5);
}

/// **VALUE**: Verifies an unreachable kdb+ process exits with code 6.
#[test]
fn given_no_kdb_process_when_run_then_exits_six() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("kdbws.log");
    let kdb_port = closed_port().to_string();

    let output = kdbws(&[
        "--kdbhost",
        "127.0.0.1",
        "--kdbport",
        &kdb_port,
        "--wshost",
        "127.0.0.1:1",
        "--onInitCallback",
        ".ws.init",
        "--proclogfile",
        log.to_str().expect("utf-8 path"),
    ]);

    assert_eq!(exit_code(&output), 6);
    assert!(read_log(&log).contains("Fatal: error connecting to kdb+ process"));
}

/// **VALUE**: Verifies an unreachable target exits with code 7 after the kdb+ login.
#[test]
fn given_kdb_up_and_no_target_when_run_then_exits_seven() {
    // GIVEN: a kdb+ stand-in that accepts one login
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let kdb_port = listener.local_addr().expect("addr").port().to_string();
    let fake_kdb = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).expect("login");
            if byte[0] == 0 {
                break;
            }
        }
        stream.write_all(&[3]).expect("answer");
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });
    let ws_port = closed_port();

    // WHEN
    let output = kdbws(&[
        "--kdbhost",
        "127.0.0.1",
        "--kdbport",
        &kdb_port,
        "--wshost",
        &format!("127.0.0.1:{ws_port}"),
        "--onCloseCallback",
        ".ws.close",
    ]);

    // THEN
    assert_eq!(exit_code(&output), 7);
    fake_kdb.join().expect("fake kdb+ thread");
}
