use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while opening, indexing or reading an archive.
///
/// A missing entry is not an error: lookups report it as `None` or `false`.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("no regular file at {0}")]
    PathNotFound(PathBuf),

    #[error("archive is already open")]
    AlreadyOpen,

    #[error("archive is not open")]
    NotOpen,

    #[error("invalid zip: {0}")]
    Format(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("read of {len} bytes at offset {offset} exceeds source size {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote source: {0}")]
    Remote(String),

    #[error("crc mismatch in {name}: expected {expected:08x}, got {actual:08x}")]
    Integrity {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("unsupported compression method {method} for {name}")]
    UnsupportedMethod { name: String, method: u16 },

    #[error("{0} is encrypted")]
    Encrypted(String),
}

impl ZipError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        ZipError::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ZipError>;
