//! Layered error definitions
//!
//! Categorized by source: config / file / format / decode / playback

use thiserror::Error;

use crate::StreamKind;

/// Unified playback error type
#[derive(Debug, Error)]
pub enum PlaybackError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== File Errors =====
    /// Recording file does not exist
    #[error("recording not found: {path}")]
    FileNotFound { path: String },

    /// Recording file exists but cannot be opened or read
    #[error("recording '{path}' is unreadable: {message}")]
    FileUnreadable { path: String, message: String },

    // ===== Format Errors =====
    /// Version field names a layout no reader understands
    #[error("unsupported recording format version {version}")]
    UnsupportedFormatVersion { version: u32 },

    /// A header chunk or sample record could not be parsed
    #[error("malformed record at offset {offset}: {message}")]
    MalformedRecord { offset: u64, message: String },

    // ===== Decode Errors =====
    /// Image payload could not be decoded
    #[error("decode failure for {stream} frame at offset {offset}: {message}")]
    DecodeFailure {
        stream: StreamKind,
        offset: u64,
        message: String,
    },

    // ===== Playback Errors =====
    /// Stream is not present in the recording
    #[error("stream {stream} is not available in this recording")]
    StreamUnavailable { stream: StreamKind },

    /// Seek target lies beyond the recorded range
    #[error("seek out of range: {message}")]
    SeekOutOfRange { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl PlaybackError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_unreadable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create malformed record error
    pub fn malformed(offset: u64, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            offset,
            message: message.into(),
        }
    }

    /// Create decode failure error
    pub fn decode(stream: StreamKind, offset: u64, message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            stream,
            offset,
            message: message.into(),
        }
    }

    pub fn seek_out_of_range(message: impl Into<String>) -> Self {
        Self::SeekOutOfRange {
            message: message.into(),
        }
    }

    /// Whether the error should stop the index builder for good
    pub fn is_terminal_for_index(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. } | Self::Io(_))
    }
}

/// Result alias used across the playback crates
pub type Result<T> = std::result::Result<T, PlaybackError>;
