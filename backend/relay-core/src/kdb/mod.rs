//! kdb+ IPC protocol support.
//!
//! The database side talks the kdb+ binary IPC protocol over plain TCP. This
//! module provides:
//!
//! - [`K`]: the kdb+ value model as a closed enum
//! - [`codec`]: message framing, value encoding/decoding, decompression
//! - [`connection`]: dialing, the login handshake, and split read/write halves
//!
//! # Protocol
//!
//! Every message is an 8-byte header followed by one serialized value:
//!
//! | offset | size | meaning |
//! |---|---|---|
//! | 0 | 1 | byte order (`1` little-endian, `0` big-endian) |
//! | 1 | 1 | message type (`0` async, `1` sync, `2` response) |
//! | 2 | 1 | compressed flag |
//! | 3 | 1 | reserved |
//! | 4 | 4 | total length including the header |

pub mod codec;
pub mod connection;

pub use connection::{KdbConnection, KdbMessage, KdbReader, KdbWriter};

/// Type codes of the kdb+ type system.
///
/// Atoms use the negated vector code.
pub mod type_code {
    pub const LIST: i8 = 0;
    pub const BOOLEAN: i8 = 1;
    pub const GUID: i8 = 2;
    pub const BYTE: i8 = 4;
    pub const SHORT: i8 = 5;
    pub const INT: i8 = 6;
    pub const LONG: i8 = 7;
    pub const REAL: i8 = 8;
    pub const FLOAT: i8 = 9;
    pub const CHAR: i8 = 10;
    pub const SYMBOL: i8 = 11;
    pub const TIMESTAMP: i8 = 12;
    pub const MONTH: i8 = 13;
    pub const DATE: i8 = 14;
    pub const DATETIME: i8 = 15;
    pub const TIMESPAN: i8 = 16;
    pub const MINUTE: i8 = 17;
    pub const SECOND: i8 = 18;
    pub const TIME: i8 = 19;
    pub const TABLE: i8 = 98;
    pub const DICTIONARY: i8 = 99;
    pub const UNARY: i8 = 101;
    pub const SORTED_DICTIONARY: i8 = 127;
    pub const ERROR: i8 = -128;

    /// Element width in bytes of the fixed-width simple vectors.
    ///
    /// Symbols are null-terminated and have no fixed width.
    pub const fn width(code: i8) -> Option<usize> {
        match code {
            BOOLEAN | BYTE | CHAR => Some(1),
            GUID => Some(16),
            SHORT => Some(2),
            INT | REAL | MONTH | DATE | MINUTE | SECOND | TIME => Some(4),
            LONG | FLOAT | TIMESTAMP | DATETIME | TIMESPAN => Some(8),
            _ => None,
        }
    }
}

/// IPC message type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Async,
    Sync,
    Response,
}

impl MessageKind {
    pub fn as_byte(self) -> u8 {
        match self {
            MessageKind::Async => 0,
            MessageKind::Sync => 1,
            MessageKind::Response => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MessageKind::Async),
            1 => Some(MessageKind::Sync),
            2 => Some(MessageKind::Response),
            _ => None,
        }
    }
}

/// Temporal atoms, stored as their raw kdb+ representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temporal {
    /// Nanoseconds since 2000.01.01.
    Timestamp(i64),
    /// Months since 2000.01.
    Month(i32),
    /// Days since 2000.01.01.
    Date(i32),
    /// Fractional days since 2000.01.01.
    Datetime(f64),
    /// Nanoseconds.
    Timespan(i64),
    Minute(i32),
    Second(i32),
    /// Milliseconds since midnight.
    Time(i32),
}

impl Temporal {
    pub fn type_code(&self) -> i8 {
        use type_code::*;
        match self {
            Temporal::Timestamp(_) => -TIMESTAMP,
            Temporal::Month(_) => -MONTH,
            Temporal::Date(_) => -DATE,
            Temporal::Datetime(_) => -DATETIME,
            Temporal::Timespan(_) => -TIMESPAN,
            Temporal::Minute(_) => -MINUTE,
            Temporal::Second(_) => -SECOND,
            Temporal::Time(_) => -TIME,
        }
    }
}

/// A simple vector the bridge has no typed use for.
///
/// `data` holds `len` elements of `type_code::width(type_code)` bytes each,
/// always little-endian regardless of the byte order it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVector {
    pub type_code: i8,
    pub attribute: u8,
    pub len: usize,
    pub data: Vec<u8>,
}

/// A kdb+ value.
#[derive(Debug, Clone, PartialEq)]
pub enum K {
    Boolean(bool),
    Guid([u8; 16]),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Real(f32),
    Float(f64),
    Char(u8),
    Symbol(String),
    Temporal(Temporal),
    /// Char vector (type 10), the kdb+ string.
    Text(Vec<u8>),
    SymbolVector(Vec<String>),
    Vector(RawVector),
    /// General list (type 0).
    List(Vec<K>),
    Dictionary {
        keys: Box<K>,
        values: Box<K>,
        sorted: bool,
    },
    /// A table is a flipped column dictionary.
    Table(Box<K>),
    Error(String),
    /// Unary primitive (type 101); `Unary(0)` is the generic null `::`.
    Unary(u8),
}

impl K {
    pub fn text(value: impl AsRef<[u8]>) -> Self {
        K::Text(value.as_ref().to_vec())
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        K::Symbol(value.into())
    }

    pub fn type_code(&self) -> i8 {
        use type_code::*;
        match self {
            K::Boolean(_) => -BOOLEAN,
            K::Guid(_) => -GUID,
            K::Byte(_) => -BYTE,
            K::Short(_) => -SHORT,
            K::Int(_) => -INT,
            K::Long(_) => -LONG,
            K::Real(_) => -REAL,
            K::Float(_) => -FLOAT,
            K::Char(_) => -CHAR,
            K::Symbol(_) => -SYMBOL,
            K::Temporal(t) => t.type_code(),
            K::Text(_) => CHAR,
            K::SymbolVector(_) => SYMBOL,
            K::Vector(v) => v.type_code,
            K::List(_) => LIST,
            K::Dictionary { sorted: false, .. } => DICTIONARY,
            K::Dictionary { sorted: true, .. } => SORTED_DICTIONARY,
            K::Table(_) => TABLE,
            K::Error(_) => ERROR,
            K::Unary(_) => UNARY,
        }
    }

    /// Number of elements; atoms count as one.
    pub fn len(&self) -> usize {
        match self {
            K::Text(bytes) => bytes.len(),
            K::SymbolVector(symbols) => symbols.len(),
            K::Vector(v) => v.len,
            K::List(items) => items.len(),
            K::Dictionary { keys, .. } => keys.len(),
            K::Table(dict) => match dict.as_ref() {
                K::Dictionary { values, .. } => match values.as_ref() {
                    K::List(columns) => columns.first().map_or(0, K::len),
                    other => other.len(),
                },
                _ => 0,
            },
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_atom(&self) -> bool {
        self.type_code() < 0
    }
}
