//! Error taxonomy shared by the encoder, the decoder and the batch layer.
//!
//! Every per-item fault is one of three kinds:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `Read`   | a source file or image could not be read |
//! | `Format` | a record cannot be framed (encode) or the container is corrupt (decode) |
//! | `Write`  | an output file, directory or image could not be created |
//!
//! `PartialFailure` is the aggregate produced by a batch in which some
//! items succeeded and others did not.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("file name is empty")]
    EmptyName,
    #[error("file name is {0} bytes long (maximum is 255)")]
    NameTooLong(usize),
    #[error("file name is not valid UTF-8")]
    NameNotUtf8,
    #[error("file content is {0} bytes long (maximum is 2147483647)")]
    ContentTooLarge(u64),
    #[error("integer field width {0} is not in 1..=4")]
    FieldWidth(usize),
    #[error("truncated {field} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        field:     &'static str,
        offset:    usize,
        needed:    usize,
        available: usize,
    },
    #[error("invalid output path: {0:?}")]
    InvalidPath(String),
    #[error("name collision: {0} was already written in this batch")]
    NameCollision(PathBuf),
    #[error("container of {0} bytes does not fit in an image canvas")]
    CanvasTooLarge(usize),
    #[error("cannot write a lossless image with extension {0:?}")]
    UnsupportedOutput(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Format,
    Write,
    PartialFailure,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path:   PathBuf,
        source: io::Error,
    },
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path:   PathBuf,
        source: image::ImageError,
    },
    #[error("{0}")]
    Format(#[from] FormatError),
    #[error("failed to write {path}: {source}")]
    Write {
        path:   PathBuf,
        source: io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        path:   PathBuf,
        source: image::ImageError,
    },
    #[error("{failed} of {total} inputs failed")]
    PartialFailure { failed: usize, total: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read { .. } | Error::ImageRead { .. }   => ErrorKind::Read,
            Error::Format(_)                               => ErrorKind::Format,
            Error::Write { .. } | Error::ImageWrite { .. } => ErrorKind::Write,
            Error::PartialFailure { .. }                   => ErrorKind::PartialFailure,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Read { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Write { path: path.into(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One input (a source file on encode, an image on decode) that failed.
#[derive(Debug)]
pub struct ItemFailure {
    pub path:  PathBuf,
    pub error: Error,
}

impl ItemFailure {
    pub fn new(path: impl Into<PathBuf>, error: impl Into<Error>) -> Self {
        Self { path: path.into(), error: error.into() }
    }
}

/// Collapse a batch's per-item results into a single outcome.
///
/// No failures is `Ok`. A batch of exactly one failed item returns that
/// item's error; every other mix is aggregated into `PartialFailure`.
pub(crate) fn batch_outcome(
    mut failures: Vec<ItemFailure>,
    successes: usize,
) -> std::result::Result<(), Error> {
    let failed = failures.len();
    match (failed, successes) {
        (0, _) => Ok(()),
        (1, 0) => Err(failures.remove(0).error),
        _      => Err(Error::PartialFailure { failed, total: failed + successes }),
    }
}
