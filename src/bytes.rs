//! Fixed-width big-endian integer fields.
//!
//! The container uses two field widths: a 1-byte name length and a 4-byte
//! content length.  Both go through the same pair of primitives,
//! [`int_to_bytes`] and [`bytes_to_int`], which are exact inverses for
//! widths 1..=4.
//!
//! # Endianness
//! Every multi-byte field is big-endian.  No negotiation is ever performed.

use byteorder::{BigEndian, ByteOrder};

use crate::error::FormatError;
use crate::record::{MAX_CONTENT_LEN, MAX_NAME_LEN};

/// Width of the name-length field.
pub const NAME_LEN_WIDTH: usize = 1;
/// Width of the content-length field.
pub const DATA_LEN_WIDTH: usize = 4;

/// The `n` least-significant bytes of `value`, most significant first.
pub fn int_to_bytes(value: u32, n: usize) -> Result<Vec<u8>, FormatError> {
    if !(1..=4).contains(&n) {
        return Err(FormatError::FieldWidth(n));
    }
    let mut full = [0u8; 4];
    BigEndian::write_u32(&mut full, value);
    Ok(full[4 - n..].to_vec())
}

/// Reassemble an unsigned integer from up to four big-endian bytes.
pub fn bytes_to_int(bytes: &[u8]) -> Result<u32, FormatError> {
    if bytes.len() > 4 {
        return Err(FormatError::FieldWidth(bytes.len()));
    }
    if bytes.is_empty() {
        return Ok(0);
    }
    Ok(BigEndian::read_uint(bytes, bytes.len()) as u32)
}

/// Append the name-length field for a name of `len` bytes.
pub fn put_name_len(buf: &mut Vec<u8>, len: usize) -> Result<(), FormatError> {
    match len {
        0                        => return Err(FormatError::EmptyName),
        n if n > MAX_NAME_LEN    => return Err(FormatError::NameTooLong(n)),
        _                        => {}
    }
    buf.extend(int_to_bytes(len as u32, NAME_LEN_WIDTH)?);
    Ok(())
}

/// Append the data-length field for `len` bytes of content.
pub fn put_data_len(buf: &mut Vec<u8>, len: usize) -> Result<(), FormatError> {
    if len as u64 > MAX_CONTENT_LEN {
        return Err(FormatError::ContentTooLarge(len as u64));
    }
    buf.extend(int_to_bytes(len as u32, DATA_LEN_WIDTH)?);
    Ok(())
}

// ── ByteCursor ───────────────────────────────────────────────────────────────

/// Bounds-checked forward reader over a byte slice.
///
/// Every read either returns exactly the requested bytes or a
/// [`FormatError::Truncated`] naming the field that ran off the end.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], FormatError> {
        if n > self.remaining() {
            return Err(FormatError::Truncated {
                field,
                offset:    self.pos,
                needed:    n,
                available: self.remaining(),
            });
        }
        let buf: &'a [u8] = self.buf;
        let out = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_name_len(&mut self) -> Result<u8, FormatError> {
        let field = self.take(NAME_LEN_WIDTH, "name length")?;
        Ok(bytes_to_int(field)? as u8)
    }

    pub fn read_data_len(&mut self) -> Result<u32, FormatError> {
        let field = self.take(DATA_LEN_WIDTH, "data length")?;
        bytes_to_int(field)
    }
}
