//! Container framing: the flat byte stream carried in an image's pixels.
//!
//! # Layout
//! ```text
//! repeat {
//!     u8      name_len     (1..=255; 0 terminates the container)
//!     [u8]    name         (name_len bytes, UTF-8)
//!     u32 BE  data_len
//!     [u8]    data         (data_len bytes)
//! }
//! u8 0x00                  (sentinel)
//! ```
//! Anything after the sentinel is padding and is never looked at.
//!
//! # Writer
//! [`ContainerWriter`] appends records in call order and seals the stream
//! with the sentinel in [`ContainerWriter::finish`].
//!
//! # Reader
//! [`ContainerReader`] walks the stream with an explicit state machine and
//! yields borrowed [`RecordRef`]s.  The first framing fault ends iteration
//! with an error; the caller decides what to roll back.

use crate::bytes::{put_data_len, put_name_len, ByteCursor, DATA_LEN_WIDTH, NAME_LEN_WIDTH};
use crate::error::FormatError;
use crate::record::FileRecord;

/// Value of the name-length byte that ends a container.
pub const SENTINEL: u8 = 0;

/// Bytes a record occupies in the stream.
pub fn record_len(name_len: usize, data_len: usize) -> usize {
    NAME_LEN_WIDTH + name_len + DATA_LEN_WIDTH + data_len
}

/// Length of the finished stream for `records`, sentinel included.
pub fn stream_len(records: &[FileRecord]) -> usize {
    records
        .iter()
        .map(|r| record_len(r.name().len(), r.content().len()))
        .sum::<usize>()
        + 1
}

// ── Writer ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ContainerWriter {
    buf:     Vec<u8>,
    records: usize,
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self { buf: Vec::with_capacity(bytes), records: 0 }
    }

    /// Append one record.  On error nothing is appended.
    pub fn push(&mut self, record: &FileRecord) -> Result<(), FormatError> {
        let name = record.name().as_bytes();
        let data = record.content();
        let start = self.buf.len();
        self.buf.reserve(record_len(name.len(), data.len()));
        if let Err(e) = put_name_len(&mut self.buf, name.len()) {
            self.buf.truncate(start);
            return Err(e);
        }
        self.buf.extend_from_slice(name);
        if let Err(e) = put_data_len(&mut self.buf, data.len()) {
            self.buf.truncate(start);
            return Err(e);
        }
        self.buf.extend_from_slice(data);
        self.records += 1;
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Seal the container with the sentinel and return the byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(SENTINEL);
        self.buf
    }
}

/// Serialize `records` in order into a sealed byte stream.
pub fn serialize(records: &[FileRecord]) -> Result<Vec<u8>, FormatError> {
    let mut writer = ContainerWriter::with_capacity(stream_len(records));
    for record in records {
        writer.push(record)?;
    }
    Ok(writer.finish())
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// One record borrowed from a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef<'a> {
    /// Raw name bytes; not yet checked for UTF-8 or path safety.
    pub name:    &'a [u8],
    pub content: &'a [u8],
    /// Offset of this record's name-length byte in the stream.
    pub offset:  usize,
}

impl<'a> RecordRef<'a> {
    pub fn name_str(&self) -> Result<&'a str, FormatError> {
        std::str::from_utf8(self.name).map_err(|_| FormatError::NameNotUtf8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadNameLen,
    ReadName { offset: usize, len: usize },
    ReadDataLen { offset: usize, name_start: usize, name_len: usize },
    ReadData { offset: usize, name_start: usize, name_len: usize, len: usize },
    Done,
    Corrupt,
}

/// Streaming parser over a container byte stream.
#[derive(Debug, Clone)]
pub struct ContainerReader<'a> {
    buf:    &'a [u8],
    cursor: ByteCursor<'a>,
    state:  State,
}

impl<'a> ContainerReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: ByteCursor::new(buf), state: State::ReadNameLen }
    }

    /// True once the sentinel has been consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Bytes consumed so far.  After the sentinel this is the useful
    /// length of the stream; the rest is padding.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Drive the state machine until one record is complete, the sentinel
    /// is reached, or a read runs off the end of the stream.
    fn step(&mut self) -> Option<Result<RecordRef<'a>, FormatError>> {
        loop {
            let next = match self.state {
                State::Done | State::Corrupt => return None,
                State::ReadNameLen => {
                    let offset = self.cursor.position();
                    match self.cursor.read_name_len() {
                        Ok(SENTINEL) => State::Done,
                        Ok(len)      => State::ReadName { offset, len: len as usize },
                        Err(e)       => return self.fail(e),
                    }
                }
                State::ReadName { offset, len } => {
                    let name_start = self.cursor.position();
                    match self.cursor.take(len, "name") {
                        Ok(_)  => State::ReadDataLen { offset, name_start, name_len: len },
                        Err(e) => return self.fail(e),
                    }
                }
                State::ReadDataLen { offset, name_start, name_len } => {
                    match self.cursor.read_data_len() {
                        Ok(len) => State::ReadData { offset, name_start, name_len, len: len as usize },
                        Err(e)  => return self.fail(e),
                    }
                }
                State::ReadData { offset, name_start, name_len, len } => {
                    match self.cursor.take(len, "data") {
                        Ok(content) => {
                            self.state = State::ReadNameLen;
                            let buf: &'a [u8] = self.buf;
                            let name = &buf[name_start..name_start + name_len];
                            return Some(Ok(RecordRef { name, content, offset }));
                        }
                        Err(e) => return self.fail(e),
                    }
                }
            };
            self.state = next;
        }
    }

    fn fail(&mut self, err: FormatError) -> Option<Result<RecordRef<'a>, FormatError>> {
        self.state = State::Corrupt;
        Some(Err(err))
    }
}

impl<'a> Iterator for ContainerReader<'a> {
    type Item = Result<RecordRef<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

/// Parse every record up to the sentinel.
pub fn parse_all(buf: &[u8]) -> Result<Vec<RecordRef<'_>>, FormatError> {
    ContainerReader::new(buf).collect()
}
