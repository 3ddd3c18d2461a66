//! Codec error types

use contracts::{CompressionType, DecoderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload ends before the expected image size
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Decompressed size does not match the image layout
    #[error("size mismatch: expected {expected} bytes, decoded {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Compressed stream is corrupt
    #[error("{compression:?} stream rejected: {message}")]
    Corrupt {
        compression: CompressionType,
        message: String,
    },

    /// Encoding side failure
    #[error("encode failed: {0}")]
    Encode(#[from] std::io::Error),
}

impl From<CodecError> for DecoderError {
    fn from(err: CodecError) -> Self {
        DecoderError::new(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
