//! Encoding and decoding of kdb+ IPC messages.
//!
//! Decoding accepts either byte order and normalises everything into [`K`].
//! Encoding always produces little-endian, uncompressed messages, which every
//! kdb+ version accepts.

use crate::error::kdb::KdbError;
use crate::kdb::type_code::{self, *};
use crate::kdb::{K, MessageKind, RawVector, Temporal};

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 8;

/// Nesting limit for general lists and dictionaries.
const MAX_DEPTH: usize = 128;

/// Upper bound on output bytes per compressed byte. A back reference is two
/// bytes plus a flag bit and yields at most 257 bytes.
const MAX_EXPANSION: usize = 129;

/// Parsed 8-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub little_endian: bool,
    pub kind: MessageKind,
    pub compressed: bool,
    /// Total message length, header included.
    pub length: usize,
}

impl Header {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, KdbError> {
        let little_endian = match bytes[0] {
            0 => false,
            1 => true,
            other => {
                return Err(KdbError::decode(format!(
                    "invalid byte order marker {other}"
                )));
            }
        };

        let kind = MessageKind::from_byte(bytes[1])
            .ok_or_else(|| KdbError::decode(format!("invalid message type {}", bytes[1])))?;

        let raw_length = [bytes[4], bytes[5], bytes[6], bytes[7]];
        let length = if little_endian {
            u32::from_le_bytes(raw_length)
        } else {
            u32::from_be_bytes(raw_length)
        } as usize;

        if length < HEADER_LEN {
            return Err(KdbError::decode(format!(
                "message length {length} is shorter than the header"
            )));
        }

        Ok(Self {
            little_endian,
            kind,
            compressed: bytes[2] != 0,
            length,
        })
    }

    /// Length of the body that follows the header.
    pub fn body_len(&self) -> usize {
        self.length - HEADER_LEN
    }
}

/// Serialize `value` as a complete IPC message of the given kind.
///
/// Lengths are written as `u32`; values larger than 4 GiB are not supported.
pub fn encode_message(kind: MessageKind, value: &K) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(&[1, kind.as_byte(), 0, 0]);
    buf.put_u32_le(0);
    encode_value(&mut buf, value);

    let length = buf.len() as u32;
    buf[4..HEADER_LEN].copy_from_slice(&length.to_le_bytes());
    buf.freeze()
}

/// Decode a complete message (header and body).
pub fn decode_message(bytes: &[u8]) -> Result<(Header, K), KdbError> {
    let header_bytes: &[u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| KdbError::decode("message shorter than the header"))?;
    let header = Header::parse(header_bytes)?;

    let body = bytes
        .get(HEADER_LEN..header.length)
        .ok_or_else(|| KdbError::decode("message shorter than its declared length"))?;

    Ok((header, decode_body(&header, body)?))
}

/// Decode the body of a message whose header has already been read.
pub fn decode_body(header: &Header, body: &[u8]) -> Result<K, KdbError> {
    if header.compressed {
        let inflated = decompress(body, header.little_endian)?;
        Decoder::new(&inflated, header.little_endian).value(0)
    } else {
        Decoder::new(body, header.little_endian).value(0)
    }
}

/// Inflate a compressed message body.
///
/// The first four bytes hold the uncompressed length (header included). The
/// stream is a sequence of flag bytes, each governing the next eight items:
/// a clear bit is one literal byte, a set bit is a back reference made of a
/// hash-table index followed by a run length.
pub fn decompress(body: &[u8], little_endian: bool) -> Result<Vec<u8>, KdbError> {
    let raw_total: [u8; 4] = body
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| KdbError::decode("compressed body is missing its length"))?;
    let total = if little_endian {
        u32::from_le_bytes(raw_total)
    } else {
        u32::from_be_bytes(raw_total)
    } as usize;

    if total < HEADER_LEN {
        return Err(KdbError::decode(format!(
            "uncompressed length {total} is shorter than the header"
        )));
    }

    let limit = body
        .len()
        .saturating_sub(4)
        .saturating_mul(MAX_EXPANSION)
        .saturating_add(HEADER_LEN);
    if total > limit {
        return Err(KdbError::decode(format!(
            "uncompressed length {total} exceeds what {} compressed bytes can hold",
            body.len()
        )));
    }

    let source = |index: usize| {
        body.get(index)
            .copied()
            .ok_or_else(|| KdbError::decode("compressed body is truncated"))
    };
    let overflow = || KdbError::decode("compressed body expands past its declared length");

    let mut out = vec![0u8; total];
    let mut table = [0usize; 256];
    let mut s = HEADER_LEN;
    let mut p = HEADER_LEN;
    let mut d = 4;
    let mut flags = 0u32;
    let mut bit = 0u32;

    while s < total {
        if bit == 0 {
            flags = u32::from(source(d)?);
            d += 1;
            bit = 1;
        }

        let back_reference = flags & bit != 0;
        let mut run = 0;
        if back_reference {
            let mut r = table[usize::from(source(d)?)];
            d += 1;
            for _ in 0..2 {
                if s >= total {
                    return Err(overflow());
                }
                out[s] = out[r];
                s += 1;
                r += 1;
            }
            run = usize::from(source(d)?);
            d += 1;
            if s + run > total {
                return Err(overflow());
            }
            for m in 0..run {
                out[s + m] = out[r + m];
            }
        } else {
            out[s] = source(d)?;
            s += 1;
            d += 1;
        }

        while p + 1 < s {
            table[usize::from(out[p] ^ out[p + 1])] = p;
            p += 1;
        }

        if back_reference {
            s += run;
            p = s;
        }

        bit <<= 1;
        if bit == 256 {
            bit = 0;
        }
    }

    out.drain(..HEADER_LEN);
    Ok(out)
}

fn encode_value(buf: &mut BytesMut, value: &K) {
    buf.put_i8(value.type_code());
    match value {
        K::Boolean(b) => buf.put_u8(u8::from(*b)),
        K::Guid(g) => buf.put_slice(g),
        K::Byte(b) | K::Char(b) => buf.put_u8(*b),
        K::Short(v) => buf.put_i16_le(*v),
        K::Int(v) => buf.put_i32_le(*v),
        K::Long(v) => buf.put_i64_le(*v),
        K::Real(v) => buf.put_f32_le(*v),
        K::Float(v) => buf.put_f64_le(*v),
        K::Symbol(s) | K::Error(s) => put_symbol(buf, s),
        K::Temporal(t) => match t {
            Temporal::Timestamp(v) | Temporal::Timespan(v) => buf.put_i64_le(*v),
            Temporal::Datetime(v) => buf.put_f64_le(*v),
            Temporal::Month(v)
            | Temporal::Date(v)
            | Temporal::Minute(v)
            | Temporal::Second(v)
            | Temporal::Time(v) => buf.put_i32_le(*v),
        },
        K::Text(bytes) => {
            put_vector_header(buf, 0, bytes.len());
            buf.put_slice(bytes);
        }
        K::SymbolVector(symbols) => {
            put_vector_header(buf, 0, symbols.len());
            for symbol in symbols {
                put_symbol(buf, symbol);
            }
        }
        K::Vector(v) => {
            put_vector_header(buf, v.attribute, v.len);
            buf.put_slice(&v.data);
        }
        K::List(items) => {
            put_vector_header(buf, 0, items.len());
            for item in items {
                encode_value(buf, item);
            }
        }
        K::Dictionary { keys, values, .. } => {
            encode_value(buf, keys);
            encode_value(buf, values);
        }
        K::Table(dict) => {
            buf.put_u8(0);
            encode_value(buf, dict);
        }
        K::Unary(op) => buf.put_u8(*op),
    }
}

fn put_vector_header(buf: &mut BytesMut, attribute: u8, len: usize) {
    buf.put_u8(attribute);
    buf.put_u32_le(len as u32);
}

fn put_symbol(buf: &mut BytesMut, symbol: &str) {
    buf.put_slice(symbol.as_bytes());
    buf.put_u8(0);
}

struct Decoder<'a> {
    buf: &'a [u8],
    little_endian: bool,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8], little_endian: bool) -> Self {
        Self { buf, little_endian }
    }

    fn need(&self, n: usize) -> Result<(), KdbError> {
        if self.buf.remaining() < n {
            return Err(KdbError::decode(format!(
                "truncated value: needed {n} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], KdbError> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, KdbError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn i8(&mut self) -> Result<i8, KdbError> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    fn i16(&mut self) -> Result<i16, KdbError> {
        self.need(2)?;
        Ok(if self.little_endian {
            self.buf.get_i16_le()
        } else {
            self.buf.get_i16()
        })
    }

    fn i32(&mut self) -> Result<i32, KdbError> {
        self.need(4)?;
        Ok(if self.little_endian {
            self.buf.get_i32_le()
        } else {
            self.buf.get_i32()
        })
    }

    fn u32(&mut self) -> Result<u32, KdbError> {
        self.need(4)?;
        Ok(if self.little_endian {
            self.buf.get_u32_le()
        } else {
            self.buf.get_u32()
        })
    }

    fn i64(&mut self) -> Result<i64, KdbError> {
        self.need(8)?;
        Ok(if self.little_endian {
            self.buf.get_i64_le()
        } else {
            self.buf.get_i64()
        })
    }

    fn f32(&mut self) -> Result<f32, KdbError> {
        self.need(4)?;
        Ok(if self.little_endian {
            self.buf.get_f32_le()
        } else {
            self.buf.get_f32()
        })
    }

    fn f64(&mut self) -> Result<f64, KdbError> {
        self.need(8)?;
        Ok(if self.little_endian {
            self.buf.get_f64_le()
        } else {
            self.buf.get_f64()
        })
    }

    fn symbol(&mut self) -> Result<String, KdbError> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| KdbError::decode("unterminated symbol"))?;
        let raw = self.take(end)?;
        self.buf.advance(1);
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn vector_header(&mut self) -> Result<(u8, usize), KdbError> {
        let attribute = self.u8()?;
        let len = self.u32()? as usize;
        Ok((attribute, len))
    }

    fn value(&mut self, depth: usize) -> Result<K, KdbError> {
        if depth > MAX_DEPTH {
            return Err(KdbError::decode("value nested too deeply"));
        }

        let code = self.i8()?;
        match code {
            ERROR => Ok(K::Error(self.symbol()?)),
            c if c < 0 => self.atom(c),
            LIST => {
                let (_, len) = self.vector_header()?;
                let mut items = Vec::with_capacity(len.min(self.buf.remaining()));
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                Ok(K::List(items))
            }
            CHAR => {
                let (_, len) = self.vector_header()?;
                Ok(K::Text(self.take(len)?.to_vec()))
            }
            SYMBOL => {
                let (_, len) = self.vector_header()?;
                let mut symbols = Vec::with_capacity(len.min(self.buf.remaining()));
                for _ in 0..len {
                    symbols.push(self.symbol()?);
                }
                Ok(K::SymbolVector(symbols))
            }
            BOOLEAN..=TIME => {
                let width = type_code::width(code)
                    .ok_or_else(|| KdbError::decode(format!("unsupported vector type {code}")))?;
                let (attribute, len) = self.vector_header()?;
                let size = len
                    .checked_mul(width)
                    .ok_or_else(|| KdbError::decode("vector length overflows"))?;
                let raw = self.take(size)?;
                Ok(K::Vector(RawVector {
                    type_code: code,
                    attribute,
                    len,
                    data: self.to_little_endian(raw, code, width),
                }))
            }
            TABLE => {
                self.u8()?;
                Ok(K::Table(Box::new(self.value(depth + 1)?)))
            }
            DICTIONARY | SORTED_DICTIONARY => {
                let keys = self.value(depth + 1)?;
                let values = self.value(depth + 1)?;
                Ok(K::Dictionary {
                    keys: Box::new(keys),
                    values: Box::new(values),
                    sorted: code == SORTED_DICTIONARY,
                })
            }
            UNARY => Ok(K::Unary(self.u8()?)),
            other => Err(KdbError::decode(format!("unsupported type {other}"))),
        }
    }

    fn atom(&mut self, code: i8) -> Result<K, KdbError> {
        let value = match -code {
            BOOLEAN => K::Boolean(self.u8()? != 0),
            GUID => {
                let mut guid = [0u8; 16];
                guid.copy_from_slice(self.take(16)?);
                K::Guid(guid)
            }
            BYTE => K::Byte(self.u8()?),
            SHORT => K::Short(self.i16()?),
            INT => K::Int(self.i32()?),
            LONG => K::Long(self.i64()?),
            REAL => K::Real(self.f32()?),
            FLOAT => K::Float(self.f64()?),
            CHAR => K::Char(self.u8()?),
            SYMBOL => K::Symbol(self.symbol()?),
            TIMESTAMP => K::Temporal(Temporal::Timestamp(self.i64()?)),
            MONTH => K::Temporal(Temporal::Month(self.i32()?)),
            DATE => K::Temporal(Temporal::Date(self.i32()?)),
            DATETIME => K::Temporal(Temporal::Datetime(self.f64()?)),
            TIMESPAN => K::Temporal(Temporal::Timespan(self.i64()?)),
            MINUTE => K::Temporal(Temporal::Minute(self.i32()?)),
            SECOND => K::Temporal(Temporal::Second(self.i32()?)),
            TIME => K::Temporal(Temporal::Time(self.i32()?)),
            _ => return Err(KdbError::decode(format!("unsupported atom type {code}"))),
        };
        Ok(value)
    }

    fn to_little_endian(&self, raw: &[u8], code: i8, width: usize) -> Vec<u8> {
        // GUIDs are byte arrays, never swapped.
        if self.little_endian || width == 1 || code == GUID {
            return raw.to_vec();
        }
        raw.chunks_exact(width)
            .flat_map(|chunk| chunk.iter().rev().copied())
            .collect()
    }
}
