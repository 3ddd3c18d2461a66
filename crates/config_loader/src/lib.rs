//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `PlaybackConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("playback.toml")).unwrap();
//! println!("Recording: {}", config.file.display());
//! ```

mod parser;
mod validator;

pub use contracts::PlaybackConfig;
pub use parser::ConfigFormat;

use contracts::PlaybackError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    /// A relative recording path is resolved against the config file's
    /// directory.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<PlaybackConfig, PlaybackError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let mut config = Self::load_from_str(&content, format)?;
        if config.file.is_relative() {
            if let Some(parent) = path.parent() {
                config.file = parent.join(&config.file);
            }
        }
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PlaybackConfig, PlaybackError> {
        Self::parse_and_validate(content, format)
    }

    /// Check an already built configuration (e.g. after CLI overrides)
    pub fn validate(config: &PlaybackConfig) -> Result<(), PlaybackError> {
        validator::validate(config)
    }

    /// Serialize PlaybackConfig to TOML string
    pub fn to_toml(config: &PlaybackConfig) -> Result<String, PlaybackError> {
        toml::to_string_pretty(config)
            .map_err(|e| PlaybackError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize PlaybackConfig to JSON string
    pub fn to_json(config: &PlaybackConfig) -> Result<String, PlaybackError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| PlaybackError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, PlaybackError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            PlaybackError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            PlaybackError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, PlaybackError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PlaybackConfig, PlaybackError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
