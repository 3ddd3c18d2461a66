//! Playback session orchestration module.

mod dump;
mod runner;
mod stats;

pub use runner::{PlaybackSession, SeekRequest, SessionConfig};
pub use stats::SessionStats;
