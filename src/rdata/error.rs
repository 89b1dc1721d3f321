//! Error types for R data file decoding.

use thiserror::Error;

/// Errors that can occur decoding an `.rda` / `.RData` file.
#[derive(Error, Debug)]
pub enum RDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither `RDX2` nor `RDX3` after decompression.
    #[error("not an R data file (bad magic {0:?})")]
    BadMagic(String),

    /// Only the XDR (`X`) serialization is handled.
    #[error("unsupported serialization format {0:?}")]
    UnsupportedFormat(String),

    #[error("unsupported serialization version: {0}")]
    UnsupportedVersion(i32),

    #[error("unexpected end of buffer at offset {offset}, need {need} bytes, have {have}")]
    BufferUnderflow {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("unknown SEXP type {0} at offset {1}")]
    UnknownType(u8, usize),

    #[error("unsupported SEXP type {0}")]
    Unsupported(&'static str),

    #[error("unsupported ALTREP class {0:?}")]
    UnsupportedAltrep(String),

    #[error("reference {0} not in table (size {1})")]
    BadReference(usize, usize),

    #[error("negative vector length {0}")]
    BadLength(i64),

    #[error("decompression error: {0}")]
    Decompression(String),

    #[error("invalid data frame {name}: {reason}")]
    InvalidFrame { name: String, reason: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T> = std::result::Result<T, RDataError>;
