//! Playback configuration contracts shared by the loader, engine and CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::StreamKind;

/// Samples kept decoded ahead of dispatch, across all enabled streams
pub const NUMBER_OF_REQUIRED_PREFETCHED_SAMPLES: usize = 20;

/// Records scanned per indexing step of the worker
pub const NUMBER_OF_SAMPLES_TO_INDEX: usize = 1;

/// Playback session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Recording to open
    pub file: PathBuf,

    /// Delivery timing
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Streams enabled at start
    #[serde(default)]
    pub streams: StreamSelection,

    /// Prefetch / indexing tuning
    #[serde(default)]
    pub prefetch: PrefetchConfig,

    /// Motion sample handling
    #[serde(default)]
    pub motion: MotionPolicy,
}

impl PlaybackConfig {
    /// Defaults for a given recording path
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            pacing: PacingConfig::default(),
            streams: StreamSelection::default(),
            prefetch: PrefetchConfig::default(),
            motion: MotionPolicy::default(),
        }
    }
}

/// Pacing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Reproduce capture cadence; otherwise deliver as fast as decoded
    pub realtime: bool,
    /// Playback speed multiplier (1.0 = original cadence)
    pub speed: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            speed: 1.0,
        }
    }
}

/// Initial stream selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSelection {
    /// Video streams to enable (empty = every stream in the file)
    pub enabled: Vec<StreamKind>,
    /// Deliver motion samples
    pub motion: bool,
}

impl Default for StreamSelection {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            motion: true,
        }
    }
}

/// Prefetch buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Global buffer cap
    pub depth: usize,
    /// Records indexed per worker step
    pub index_batch: usize,
    /// Back-pressure / idle re-check interval in milliseconds
    pub idle_poll_ms: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            depth: NUMBER_OF_REQUIRED_PREFETCHED_SAMPLES,
            index_batch: NUMBER_OF_SAMPLES_TO_INDEX,
            idle_poll_ms: 5,
        }
    }
}

/// Late motion sample policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionPolicy {
    /// Drop motion samples that fall behind the pacing clock
    pub drop_late: bool,
    /// Lateness tolerated before a motion sample is dropped
    pub lag_tolerance_ms: u64,
}

impl Default for MotionPolicy {
    fn default() -> Self {
        Self {
            drop_late: false,
            lag_tolerance_ms: 100,
        }
    }
}
