//! Drop accounting and playback statistics.

use std::collections::BTreeMap;

use contracts::StreamKind;
use serde::Serialize;

/// Additive drop counters
///
/// Fed by the consumer (`update_*_drop_count`) and by the engine itself
/// (undecodable frames, late motion samples).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropCounters {
    pub frames: BTreeMap<StreamKind, u64>,
    pub imu: u64,
}

impl DropCounters {
    pub fn add_frames(&mut self, stream: StreamKind, count: u64) {
        *self.frames.entry(stream).or_insert(0) += count;
    }

    pub fn add_imu(&mut self, count: u64) {
        self.imu += count;
    }

    pub fn frames_for(&self, stream: StreamKind) -> u64 {
        self.frames.get(&stream).copied().unwrap_or(0)
    }

    pub fn total_frames(&self) -> u64 {
        self.frames.values().sum()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Running counters kept by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackCounters {
    pub dispatched_frames: u64,
    pub dispatched_motion: u64,
    pub decoded_frames: u64,
    pub decode_failures: u64,
}

/// Per enabled channel progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Samples materialized since the channel was enabled
    pub prefetched: u32,
    /// Of those, still waiting in the prefetch buffer
    pub buffered: usize,
}

/// Point-in-time snapshot of an engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStats {
    pub counters: PlaybackCounters,
    pub drops: DropCounters,
    /// Samples waiting in the prefetch buffer
    pub buffered: usize,
    /// Keyed by channel name, enabled channels only
    pub channels: BTreeMap<String, ChannelStats>,
    pub indexed: usize,
    pub index_complete: bool,
    pub paused: bool,
    pub realtime: bool,
    pub end_of_stream: bool,
}

impl PlaybackStats {
    pub fn dispatched(&self) -> u64 {
        self.counters.dispatched_frames + self.counters.dispatched_motion
    }
}
