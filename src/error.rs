//! Typed errors for the encoder and decoder.
//!
//! Every decode failure carries the byte offset at which it was detected, per
//! the error design in the specification: errors are never swallowed and
//! always carry positional context.

use std::fmt;

/// Errors raised while turning a [`crate::Value`] into bytes.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The dynamic type of a value had no registered handler and no default
    /// handler was configured.
    #[error("cannot encode value: no handler registered for this type")]
    Type,

    /// A value violates a semantic rule of the encoder (naive datetime with
    /// no default timezone, a cycle while value sharing is disabled, a tag
    /// number outside 0..2^64, ...).
    #[error("{0}")]
    Value(String),

    /// The underlying byte sink failed.
    #[error("write error: {0}")]
    Io(#[source] std::io::Error),

    /// A user-supplied hook (default handler, shareable wrapper) raised.
    #[error("hook error: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EncodeError {
    pub fn value(msg: impl Into<String>) -> Self {
        EncodeError::Value(msg.into())
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        EncodeError::Io(e)
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// The kind of malformed-structure failure encountered while decoding.
///
/// Kept separate from [`DecodeError`] so every variant can carry a byte
/// offset uniformly without repeating the field in every arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeValueErrorKind {
    ReservedSubtype(u8),
    InvalidUtf8,
    BadTagPayload { tag: u64, reason: String },
    OutOfNamespace(u64),
    ShareableNotInitialized(u64),
    ShareableNotFound(u64),
    InvalidDatetime(String),
    UnknownIntegerSubtype(u8),
    IndefiniteNotAllowedHere,
    NonMatchingIndefiniteChild,
    DuplicateShareSlot(u64),
    Custom(String),
}

impl fmt::Display for DecodeValueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedSubtype(s) => write!(f, "reserved subtype {s} used in head byte"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8 in text string"),
            Self::BadTagPayload { tag, reason } => {
                write!(f, "invalid payload for tag {tag}: {reason}")
            }
            Self::OutOfNamespace(i) => write!(f, "string reference {i} outside any open namespace"),
            Self::ShareableNotInitialized(i) => {
                write!(f, "shared value {i} has not been initialized")
            }
            Self::ShareableNotFound(i) => write!(f, "shared reference {i} not found"),
            Self::InvalidDatetime(s) => write!(f, "invalid datetime string: {s:?}"),
            Self::UnknownIntegerSubtype(s) => write!(f, "unknown unsigned integer subtype {s:#x}"),
            Self::IndefiniteNotAllowedHere => {
                write!(f, "indefinite-length marker not valid for this major type")
            }
            Self::NonMatchingIndefiniteChild => write!(
                f,
                "indefinite bytestring/text chunk has the wrong major type or is itself indefinite"
            ),
            Self::DuplicateShareSlot(i) => {
                write!(f, "value already shared under slot {i}")
            }
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

/// Errors raised while turning bytes into a [`crate::Value`].
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// Malformed structure: anything from a reserved subtype to a bad tag
    /// payload shape.
    #[error("decode error at byte offset {offset}: {kind}")]
    Value {
        offset: u64,
        kind: DecodeValueErrorKind,
    },

    /// The byte source was exhausted before a full item could be read.
    #[error("unexpected end of input at byte offset {offset} (wanted {wanted} more byte(s))")]
    Eof { offset: u64, wanted: u64 },

    /// Recursion depth exceeded the configured maximum.
    #[error("maximum recursion depth ({max_depth}) exceeded at byte offset {offset}")]
    DepthExceeded { offset: u64, max_depth: u32 },

    /// The underlying byte source failed.
    #[error("read error: {0}")]
    Io(#[source] std::io::Error),

    /// A user-supplied hook (`tag_hook`, `object_hook`) raised.
    #[error("hook error: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DecodeError {
    pub fn value(offset: u64, kind: DecodeValueErrorKind) -> Self {
        DecodeError::Value { offset, kind }
    }

    pub fn custom(offset: u64, msg: impl Into<String>) -> Self {
        DecodeError::Value {
            offset,
            kind: DecodeValueErrorKind::Custom(msg.into()),
        }
    }

    /// The byte offset at which the error was detected, when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecodeError::Value { offset, .. } => Some(*offset),
            DecodeError::Eof { offset, .. } => Some(*offset),
            DecodeError::DepthExceeded { offset, .. } => Some(*offset),
            DecodeError::Io(_) | DecodeError::Hook(_) => None,
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        DecodeError::Io(e)
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
