// Unit tests for the kdb+ login handshake and framed reads/writes
// Uses in-memory duplex pipes in place of TCP sockets

use crate::error::kdb::KdbError;
use crate::kdb::codec::encode_message;
use crate::kdb::connection::{CLIENT_CAPABILITY, handshake};
use crate::kdb::{K, KdbReader, KdbWriter, MessageKind};

use common::RedactedSecret;

use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

/// Read the login bytes a client sent, up to and including the NUL.
async fn read_login<S: AsyncReadExt + Unpin>(stream: &mut S) -> Vec<u8> {
    let mut login = Vec::new();
    loop {
        let byte = stream.read_u8().await.expect("login byte");
        login.push(byte);
        if byte == 0 {
            return login;
        }
    }
}

// ============================================
// HANDSHAKE
// ============================================

/// **VALUE**: Verifies the login bytes and the accepted answer.
///
/// **WHY THIS MATTERS**: kdb+ authenticates on this exact format; any deviation is
/// a refused login and a fatal dial error at startup.
///
/// **BUG THIS CATCHES**: Missing capability byte or missing NUL terminator.
#[tokio::test]
async fn given_credentials_when_handshaking_then_sends_login_and_returns_capability() {
    // GIVEN
    let (mut client, mut server) = duplex(1024);
    let credentials = RedactedSecret::new("user:pass");
    let server_task = tokio::spawn(async move {
        let login = read_login(&mut server).await;
        server.write_all(&[CLIENT_CAPABILITY]).await.expect("answer");
        login
    });

    // WHEN
    let capability = handshake(&mut client, Some(&credentials))
        .await
        .expect("handshake");

    // THEN
    assert_eq!(capability, CLIENT_CAPABILITY);
    let login = server_task.await.expect("server task");
    assert_eq!(login, b"user:pass\x03\x00");
}

/// **VALUE**: Verifies an anonymous login is just capability and NUL.
#[tokio::test]
async fn given_no_credentials_when_handshaking_then_sends_empty_login() {
    let (mut client, mut server) = duplex(1024);
    let server_task = tokio::spawn(async move {
        let login = read_login(&mut server).await;
        server.write_all(&[1]).await.expect("answer");
        login
    });

    let capability = handshake(&mut client, None).await.expect("handshake");

    assert_eq!(capability, 1);
    assert_eq!(server_task.await.expect("server task"), vec![CLIENT_CAPABILITY, 0]);
}

/// **VALUE**: Verifies a refused login is a handshake error.
///
/// **WHY THIS MATTERS**: kdb+ signals a bad password by closing the socket without
/// answering; that must not be mistaken for success.
#[tokio::test]
async fn given_server_closes_after_login_when_handshaking_then_returns_handshake_error() {
    // GIVEN
    let (mut client, mut server) = duplex(1024);
    let server_task = tokio::spawn(async move {
        read_login(&mut server).await;
        drop(server);
    });

    // WHEN
    let result = handshake(&mut client, Some(&RedactedSecret::new("bad:creds"))).await;

    // THEN
    server_task.await.expect("server task");
    assert!(matches!(result, Err(KdbError::Handshake { .. })));
}

// ============================================
// FRAMED READS AND WRITES
// ============================================

/// **VALUE**: Verifies a written message is read back whole, with its type.
#[tokio::test]
async fn given_async_message_when_written_then_reader_decodes_it() {
    // GIVEN
    let (writer_side, reader_side) = duplex(1024);
    let mut writer = KdbWriter::new(writer_side);
    let mut reader = KdbReader::new(reader_side);
    let value = K::List(vec![K::symbol("message"), K::text("hello")]);

    // WHEN
    writer.send_async(&value).await.expect("write");
    let message = reader.read_message().await.expect("read");

    // THEN
    assert_eq!(message.kind, MessageKind::Async);
    assert_eq!(message.value, value);
}

/// **VALUE**: Verifies messages split across many small writes are reassembled.
///
/// **BUG THIS CATCHES**: A reader that decodes whatever one read returned instead
/// of waiting for the declared length.
#[tokio::test]
async fn given_message_in_fragments_when_read_then_decodes_once_complete() {
    let (mut raw, reader_side) = duplex(1024);
    let mut reader = KdbReader::new(reader_side);
    let bytes = encode_message(MessageKind::Sync, &K::text("fragmented"));

    let writer_task = tokio::spawn(async move {
        for chunk in bytes.chunks(3) {
            raw.write_all(chunk).await.expect("chunk");
            tokio::task::yield_now().await;
        }
        raw
    });

    let message = reader.read_message().await.expect("read");
    let _raw = writer_task.await.expect("writer task");

    assert_eq!(message.kind, MessageKind::Sync);
    assert_eq!(message.value, K::text("fragmented"));
}

/// **VALUE**: Verifies peer shutdown is reported as `Closed`.
///
/// **WHY THIS MATTERS**: The listener reports this as the fatal kdb+ read error
/// that ends the process with its dedicated exit code.
#[tokio::test]
async fn given_peer_closed_when_reading_then_returns_closed_error() {
    let (writer_side, reader_side) = duplex(1024);
    let mut reader = KdbReader::new(reader_side);
    drop(writer_side);

    let result = reader.read_message().await;

    assert!(matches!(result, Err(KdbError::Closed { .. })));
}

/// **VALUE**: Verifies a header announcing a huge body ends as `Closed` once the
/// peer stops sending.
///
/// **BUG THIS CATCHES**: Allocating the declared length up front, which aborts the
/// process for a corrupt header instead of reporting a kdb+ read error.
#[tokio::test]
async fn given_header_declaring_huge_body_when_peer_closes_then_returns_closed_error() {
    // GIVEN: little-endian async header declaring just under 4 GiB
    let (mut raw, reader_side) = duplex(1024);
    let mut reader = KdbReader::new(reader_side);
    let mut bytes = vec![1u8, 0, 0, 0];
    bytes.extend_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
    bytes.extend_from_slice(b"abc");
    raw.write_all(&bytes).await.expect("partial message");
    drop(raw);

    // WHEN
    let result = reader.read_message().await;

    // THEN
    match result {
        Err(KdbError::Closed { message, .. }) => assert!(message.contains("3 of")),
        other => panic!("expected Closed, got {other:?}"),
    }
}

/// **VALUE**: Verifies a write to a closed peer fails instead of hanging.
#[tokio::test]
async fn given_peer_closed_when_writing_then_returns_error() {
    let (writer_side, reader_side) = duplex(1024);
    let mut writer = KdbWriter::new(writer_side);
    drop(reader_side);

    let result = writer.send_async(&K::Boolean(true)).await;

    assert!(result.is_err());
}
