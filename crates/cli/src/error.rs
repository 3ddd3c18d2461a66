//! Error types for CLI operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Neither a recording nor a configuration was given
    #[error("No recording given: pass a file or --config")]
    NoRecording,

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Recording file not found
    #[error("Recording not found: {path}")]
    RecordingNotFound { path: PathBuf },

    /// Malformed `stream:index` argument
    #[error("Invalid corrupt frame '{value}': {message}")]
    InvalidFrameRef { value: String, message: String },

    /// Writing a dumped sample failed
    #[error("Failed to write {path}: {message}")]
    Dump { path: PathBuf, message: String },

    /// Engine or format failure
    #[error(transparent)]
    Playback(#[from] contracts::PlaybackError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn recording_not_found(path: &Path) -> Self {
        Self::RecordingNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn invalid_frame_ref(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFrameRef {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn dump(path: &Path, message: impl ToString) -> Self {
        Self::Dump {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
