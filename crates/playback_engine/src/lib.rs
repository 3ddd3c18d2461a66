//! # Playback Engine
//!
//! Disk-backed playback of multi-stream capture recordings.
//!
//! Responsibilities:
//! - Incremental sample indexing of the recording
//! - Bounded prefetch with decoding on a background worker
//! - Real-time pacing that reproduces capture cadence
//! - Seek by frame index or capture timestamp
//! - Drop accounting
//!
//! ## Example
//!
//! ```ignore
//! use playback_engine::{PlaybackConfig, PlaybackEngine};
//!
//! let engine = PlaybackEngine::init(PlaybackConfig::for_file("capture.rscp"))?;
//! engine.set_sample_callback(|sample| {
//!     // Handle delivered frame or motion sample
//! });
//! engine.set_end_of_stream_callback(|| println!("done"));
//! engine.resume()?;
//! ```

mod engine;
mod index;
mod pacing;
mod payload;
mod prefetch;
mod seek;
mod stats;
mod streams;
mod worker;

pub use engine::PlaybackEngine;
pub use index::{IndexedSample, SampleIndex};
pub use pacing::PacingController;
pub use prefetch::{PrefetchBuffer, PrefetchedSample};
pub use stats::{ChannelStats, DropCounters, PlaybackCounters, PlaybackStats};
pub use streams::{ActiveStreamInfo, ActiveStreamRegistry, ChannelCursor, PrefetchCandidate};

// Re-export contracts types
pub use contracts::{
    FrameSample, MotionSample, PlaybackConfig, PlaybackError, Result, Sample, StreamKind,
};
