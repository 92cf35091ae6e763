//! kdb+ connection handling: dial, login handshake, framed reads and writes.
//!
//! A [`KdbConnection`] is split once after the handshake. The read half goes to
//! the database listener, the write half to the callback emitter, so each
//! direction has exactly one owner and no locking is needed.

use crate::error::kdb::KdbError;
use crate::kdb::codec::{self, HEADER_LEN, Header};
use crate::kdb::{K, MessageKind};

use common::{ErrorLocation, RedactedSecret};

use std::panic::Location;

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Capability byte sent in the login handshake (compression and large messages).
pub const CLIENT_CAPABILITY: u8 = 3;

/// Initial buffer size for a message body.
const READ_CHUNK: usize = 64 * 1024;

/// One decoded inbound IPC message.
#[derive(Debug, Clone, PartialEq)]
pub struct KdbMessage {
    pub kind: MessageKind,
    pub value: K,
}

/// An open, authenticated connection to a kdb+ process.
pub struct KdbConnection {
    stream: TcpStream,
    capability: u8,
}

impl KdbConnection {
    /// Connect to `host:port` and perform the login handshake.
    ///
    /// # Errors
    ///
    /// - [`KdbError::Dial`] if the TCP connection cannot be opened
    /// - [`KdbError::Handshake`] if the process rejects the credentials
    pub async fn dial(
        host: &str,
        port: u16,
        credentials: Option<&RedactedSecret>,
    ) -> Result<Self, KdbError> {
        let address = format!("{host}:{port}");
        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|e| KdbError::Dial {
                message: format!("Failed to connect to {address}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let capability = handshake(&mut stream, credentials).await?;
        debug!("kdb+ handshake with {address} complete");

        Ok(Self { stream, capability })
    }

    /// Capability byte the kdb+ process answered with.
    pub fn capability(&self) -> u8 {
        self.capability
    }

    pub fn into_split(self) -> (KdbReader<OwnedReadHalf>, KdbWriter<OwnedWriteHalf>) {
        let (read, write) = self.stream.into_split();
        (KdbReader::new(read), KdbWriter::new(write))
    }
}

/// Send `credentials` + capability + NUL and wait for the one-byte answer.
///
/// kdb+ closes the socket instead of answering when the login is refused.
pub async fn handshake<S>(stream: &mut S, credentials: Option<&RedactedSecret>) -> Result<u8, KdbError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let user = credentials.map_or("", RedactedSecret::expose);
    let mut login = Vec::with_capacity(user.len() + 2);
    login.extend_from_slice(user.as_bytes());
    login.push(CLIENT_CAPABILITY);
    login.push(0);

    stream.write_all(&login).await?;
    stream.flush().await?;

    let mut answer = [0u8; 1];
    match stream.read(&mut answer).await {
        Ok(0) => Err(KdbError::Handshake {
            message: String::from("kdb+ process closed the connection during login (credentials rejected?)"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Ok(_) => Ok(answer[0]),
        Err(e) => Err(KdbError::Handshake {
            message: format!("Failed to read login answer: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Read half of a kdb+ connection.
pub struct KdbReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> KdbReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Block until one whole message has arrived and decode it.
    ///
    /// # Errors
    ///
    /// - [`KdbError::Closed`] when the peer closes the connection
    /// - [`KdbError::Io`] on socket errors
    /// - [`KdbError::Decode`] when the bytes are not a valid message
    pub async fn read_message(&mut self) -> Result<KdbMessage, KdbError> {
        let mut raw_header = [0u8; HEADER_LEN];
        self.inner.read_exact(&mut raw_header).await?;
        let header = Header::parse(&raw_header)?;

        // Grow with the bytes that actually arrive rather than the declared length.
        let expected = header.body_len();
        let mut body = Vec::with_capacity(expected.min(READ_CHUNK));
        (&mut self.inner)
            .take(expected as u64)
            .read_to_end(&mut body)
            .await?;
        if body.len() < expected {
            return Err(KdbError::Closed {
                message: format!(
                    "kdb+ process closed the connection after {} of {expected} body bytes",
                    body.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        debug!(
            "Read {} byte kdb+ {:?} message (compressed: {})",
            header.length, header.kind, header.compressed
        );

        let value = codec::decode_body(&header, &body)?;
        Ok(KdbMessage {
            kind: header.kind,
            value,
        })
    }
}

/// Write half of a kdb+ connection.
pub struct KdbWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> KdbWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_message(&mut self, kind: MessageKind, value: &K) -> Result<(), KdbError> {
        let bytes = codec::encode_message(kind, value);
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Fire-and-forget message; kdb+ sends no reply to async messages.
    pub async fn send_async(&mut self, value: &K) -> Result<(), KdbError> {
        self.write_message(MessageKind::Async, value).await
    }
}
