//! Byte source / sink abstraction.
//!
//! The decoder does not require a seekable source: §5 only asks for
//! `read(n) -> exactly n bytes or fail-eof`. Modeling this as a small trait
//! (rather than depending on `std::io::Read` directly) lets tests inject a
//! short-reading source to exercise `DecodeError::Eof` without constructing a
//! real truncated file, and keeps a byte offset for error reporting without
//! requiring `Seek`.

use crate::error::DecodeError;

/// A readable byte source that knows its own position.
pub trait ByteSource {
    /// Read exactly `amount` bytes, or fail with [`DecodeError::Eof`].
    fn read(&mut self, amount: usize) -> Result<&[u8], DecodeError>;

    /// Number of bytes consumed so far.
    fn position(&self) -> u64;
}

/// A `ByteSource` over an in-memory slice. This is the common case: both
/// `decode_from_bytes` and the embedded-CBOR tag (24) hook operate on
/// slices already resident in memory.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    scratch: Vec<u8>,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            scratch: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    fn read(&mut self, amount: usize) -> Result<&[u8], DecodeError> {
        let available = self.data.len().saturating_sub(self.pos);
        if amount > available {
            return Err(DecodeError::Eof {
                offset: self.pos as u64,
                wanted: (amount - available) as u64,
            });
        }
        let start = self.pos;
        self.pos += amount;
        // Copy into scratch so callers can hold the slice across further
        // reads without fighting the borrow checker; cheap for CBOR's
        // typically small head/length reads, and bytestrings borrow
        // directly from `data` via `read_borrowed`.
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.data[start..self.pos]);
        Ok(&self.scratch[..])
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }
}

impl<'a> SliceSource<'a> {
    /// Borrow `amount` bytes directly from the backing slice without the
    /// scratch-buffer copy `ByteSource::read` performs. Used for bytestring
    /// and text payloads, which can be large.
    pub fn read_borrowed(&mut self, amount: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.data.len().saturating_sub(self.pos);
        if amount > available {
            return Err(DecodeError::Eof {
                offset: self.pos as u64,
                wanted: (amount - available) as u64,
            });
        }
        let start = self.pos;
        self.pos += amount;
        Ok(&self.data[start..self.pos])
    }
}

/// A writable byte sink. Blanket-implemented for anything that is already
/// `std::io::Write` so callers can hand in a `Vec<u8>`, a file, or a socket.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), crate::error::EncodeError>;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), crate::error::EncodeError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapts any `std::io::Write` into a [`ByteSink`].
pub struct IoSink<W>(pub W);

impl<W: std::io::Write> ByteSink for IoSink<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), crate::error::EncodeError> {
        self.0.write_all(bytes).map_err(crate::error::EncodeError::from)
    }
}
