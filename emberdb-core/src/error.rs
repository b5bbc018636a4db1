//! Error types for EmberDB

use thiserror::Error;

/// Result type alias for EmberDB operations
pub type Result<T> = std::result::Result<T, EmberError>;

/// EmberDB error types
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmberError {
    /// Output buffer exhausted during encode
    #[error("output buffer overflow")]
    Overflow,

    /// Read past the end of compressed data
    #[error("unexpected end of compressed data")]
    OutOfData,

    /// Compressed data is malformed
    #[error("malformed compressed data: {0}")]
    BadData(&'static str),
}

impl EmberError {
    /// Check if error means the encode-side buffer is full
    pub fn is_overflow(&self) -> bool {
        matches!(self, EmberError::Overflow)
    }

    /// Check if error indicates truncated or corrupt input
    pub fn is_corruption(&self) -> bool {
        matches!(self, EmberError::OutOfData | EmberError::BadData(_))
    }
}
