// Unit tests for the kdb+ IPC codec
// Tests callback wire bytes, byte-order handling, decompression, and malformed input

use crate::callback::invocation;
use crate::error::kdb::KdbError;
use crate::kdb::codec::{Header, decode_message, decompress, encode_message};
use crate::kdb::{K, MessageKind, RawVector, type_code};

// ============================================
// ENCODING
// ============================================

/// **VALUE**: Pins the exact bytes of a callback invocation.
///
/// **WHY THIS MATTERS**: kdb+ evaluates `("fname"; arg)` only when the general list,
/// char vector, and boolean atom are laid out exactly as its IPC format expects.
///
/// **BUG THIS CATCHES**: Wrong length prefix, missing attribute byte, or an atom
/// encoded with the vector type code.
#[test]
fn given_ack_invocation_when_encoded_then_matches_wire_bytes() {
    // GIVEN: ("ack"; 1b)
    let value = invocation("ack", K::Boolean(true));

    // WHEN
    let bytes = encode_message(MessageKind::Async, &value);

    // THEN
    let expected: Vec<u8> = vec![
        1, 0, 0, 0, 25, 0, 0, 0, // header: little-endian, async, 25 bytes
        0, 0, 2, 0, 0, 0, // general list, 2 items
        10, 0, 3, 0, 0, 0, b'a', b'c', b'k', // "ack"
        0xff, 1, // 1b
    ];
    assert_eq!(bytes.as_ref(), expected.as_slice());
}

/// **VALUE**: Verifies the error atom used by the Error callback.
///
/// **BUG THIS CATCHES**: Error text written without its NUL terminator, which would
/// make kdb+ read past the end of the message.
#[test]
fn given_error_atom_when_encoded_then_writes_null_terminated_text() {
    let bytes = encode_message(MessageKind::Async, &K::Error(String::from("oops")));

    assert_eq!(&bytes[8..], &[0x80, b'o', b'o', b'p', b's', 0]);
    assert_eq!(bytes[4], 14);
}

// ============================================
// DECODING
// ============================================

/// **VALUE**: Verifies a nested structure survives encode then decode.
///
/// **WHY THIS MATTERS**: Units from kdb+ may carry dictionaries and typed vectors
/// the bridge does not interpret; they still have to decode cleanly so the
/// envelope check can reject them with the right error.
#[test]
fn given_nested_value_when_encoded_and_decoded_then_is_unchanged() {
    // GIVEN: (`a`b!1 2j; "text"; ::)
    let longs = RawVector {
        type_code: type_code::LONG,
        attribute: 0,
        len: 2,
        data: [1i64.to_le_bytes(), 2i64.to_le_bytes()].concat(),
    };
    let value = K::List(vec![
        K::Dictionary {
            keys: Box::new(K::SymbolVector(vec![String::from("a"), String::from("b")])),
            values: Box::new(K::Vector(longs)),
            sorted: false,
        },
        K::text("text"),
        K::Unary(0),
    ]);

    // WHEN
    let bytes = encode_message(MessageKind::Sync, &value);
    let (header, decoded) = decode_message(&bytes).expect("decode");

    // THEN
    assert_eq!(header.kind, MessageKind::Sync);
    assert_eq!(header.length, bytes.len());
    assert_eq!(decoded, value);
}

/// **VALUE**: Verifies big-endian messages decode to the same values.
///
/// **WHY THIS MATTERS**: The byte-order marker is chosen by the sending host; a
/// big-endian kdb+ process is still a valid peer.
///
/// **BUG THIS CATCHES**: Lengths or numbers read little-endian regardless of the marker.
#[test]
fn given_big_endian_message_when_decoded_then_values_match() {
    // GIVEN: (`message; 42j) from a big-endian host
    let mut body = vec![0u8, 0, 0, 0, 0, 2];
    body.push(0xf5); // -11, symbol atom
    body.extend_from_slice(b"message\0");
    body.push(0xf9); // -7, long atom
    body.extend_from_slice(&42i64.to_be_bytes());

    let mut bytes = vec![0u8, 0, 0, 0];
    bytes.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    bytes.extend_from_slice(&body);

    // WHEN
    let (header, value) = decode_message(&bytes).expect("decode");

    // THEN
    assert!(!header.little_endian);
    assert_eq!(header.kind, MessageKind::Async);
    assert_eq!(value, K::List(vec![K::symbol("message"), K::Long(42)]));
}

/// **VALUE**: Verifies big-endian vector data is normalised to little-endian.
///
/// **BUG THIS CATCHES**: Raw vectors from different hosts comparing unequal.
#[test]
fn given_big_endian_int_vector_when_decoded_then_data_is_little_endian() {
    let mut bytes = vec![0u8, 0, 0, 0, 0, 0, 0, 22];
    bytes.extend_from_slice(&[6, 0, 0, 0, 0, 2]);
    bytes.extend_from_slice(&7i32.to_be_bytes());
    bytes.extend_from_slice(&(-1i32).to_be_bytes());

    let (_, value) = decode_message(&bytes).expect("decode");

    let K::Vector(vector) = value else {
        panic!("expected a raw vector, got {value:?}");
    };
    assert_eq!(vector.type_code, type_code::INT);
    assert_eq!(vector.len, 2);
    assert_eq!(vector.data, [7i32.to_le_bytes(), (-1i32).to_le_bytes()].concat());
}

// ============================================
// DECOMPRESSION
// ============================================

/// **VALUE**: Verifies a compressed message with a back reference inflates correctly.
///
/// **WHY THIS MATTERS**: kdb+ compresses large messages to remote peers whenever the
/// login advertised capability 3, so this path is live in production.
///
/// **BUG THIS CATCHES**: Off-by-one in the hash table update or in the run copy,
/// which would corrupt repeated payload bytes.
#[test]
fn given_compressed_char_vector_when_decoded_then_inflates_payload() {
    // GIVEN: "abababab", compressed to 16 body bytes
    let bytes: Vec<u8> = vec![
        1, 0, 1, 0, 24, 0, 0, 0, // header: compressed, 24 bytes on the wire
        22, 0, 0, 0, // 22 bytes uncompressed, header included
        0x00, 10, 0, 8, 0, 0, 0, b'a', b'b', // eight literals
        0x01, 0x03, 0x04, // back reference to "ab" plus four more bytes
    ];

    // WHEN
    let (header, value) = decode_message(&bytes).expect("decode");

    // THEN
    assert!(header.compressed);
    assert_eq!(value, K::text("abababab"));
}

/// **VALUE**: Verifies a truncated compressed stream is an error, not a panic.
///
/// **BUG THIS CATCHES**: Unchecked indexing into the compressed body.
#[test]
fn given_truncated_compressed_body_when_decompressed_then_returns_decode_error() {
    let body = [22u8, 0, 0, 0, 0x00, 10, 0];

    let result = decompress(&body, true);

    assert!(matches!(result, Err(KdbError::Decode { .. })));
}

/// **VALUE**: Verifies a back reference running past the declared length is rejected.
#[test]
fn given_run_past_declared_length_when_decompressed_then_returns_decode_error() {
    let body = [
        12u8, 0, 0, 0, // 4 bytes after the header
        0x00, b'a', b'b', b'a', b'b', 0, 0, 0, 0,
    ];
    assert!(decompress(&body, true).is_ok());

    let overrun = [
        12u8, 0, 0, 0, 0b0000_0100, b'a', b'b', 0x03, 0x09,
    ];
    assert!(matches!(
        decompress(&overrun, true),
        Err(KdbError::Decode { .. })
    ));
}

/// **VALUE**: Verifies a declared length no compressed body could reach is rejected
/// before anything is allocated.
///
/// **BUG THIS CATCHES**: Trusting the length prefix, so a few corrupt bytes claiming
/// a gigabyte abort the process on allocation instead of ending as a read error.
#[test]
fn given_length_beyond_possible_expansion_when_decompressed_then_returns_decode_error() {
    let body = [0u8, 0, 0, 0x40, 0x00, b'a'];

    let result = decompress(&body, true);

    match result {
        Err(KdbError::Decode { message, .. }) => assert!(message.contains("exceeds")),
        other => panic!("expected a decode error, got {other:?}"),
    }
}

// ============================================
// MALFORMED INPUT
// ============================================

/// **VALUE**: Verifies short or inconsistent input is reported as a decode error.
///
/// **WHY THIS MATTERS**: The listener turns any decode error into a fatal kdb+ read
/// error; a panic would instead take the whole process down without an exit code.
#[test]
fn given_truncated_message_when_decoded_then_returns_decode_error() {
    let mut bytes = encode_message(MessageKind::Async, &K::text("hello")).to_vec();
    bytes.truncate(bytes.len() - 2);

    assert!(matches!(
        decode_message(&bytes),
        Err(KdbError::Decode { .. })
    ));
    assert!(matches!(
        decode_message(&bytes[..5]),
        Err(KdbError::Decode { .. })
    ));
}

#[test]
fn given_vector_longer_than_body_when_decoded_then_returns_decode_error() {
    // Char vector claiming 200 bytes, carrying 2
    let bytes = [1u8, 0, 0, 0, 16, 0, 0, 0, 10, 0, 200, 0, 0, 0, b'h', b'i'];

    assert!(matches!(
        decode_message(&bytes),
        Err(KdbError::Decode { .. })
    ));
}

#[test]
fn given_unsupported_type_when_decoded_then_returns_decode_error() {
    // Type 100 is a lambda
    let bytes = [1u8, 0, 0, 0, 11, 0, 0, 0, 100, 0, 0];

    let error = decode_message(&bytes).expect_err("lambda should not decode");

    assert!(error.to_string().contains("unsupported type 100"));
}

#[test]
fn given_bad_header_bytes_when_parsed_then_rejects_them() {
    assert!(Header::parse(&[2, 0, 0, 0, 8, 0, 0, 0]).is_err());
    assert!(Header::parse(&[1, 3, 0, 0, 8, 0, 0, 0]).is_err());
    assert!(Header::parse(&[1, 0, 0, 0, 4, 0, 0, 0]).is_err());

    let header = Header::parse(&[1, 2, 0, 0, 8, 0, 0, 0]).expect("minimal header");
    assert_eq!(header.kind, MessageKind::Response);
    assert_eq!(header.body_len(), 0);
}
