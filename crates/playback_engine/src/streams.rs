//! Registry of enabled channels and their cursors into the sample index.

use std::collections::{BTreeMap, HashMap};

use contracts::{Channel, PlaybackError, Result, StreamInfo, StreamKind};

use crate::index::SampleIndex;

/// Per enabled channel bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStreamInfo {
    pub channel: Channel,
    /// Stream header; `None` for the motion channel
    pub info: Option<StreamInfo>,
    /// Samples prefetched since the channel was enabled
    pub prefetched: u32,
}

/// Where a channel stands in its own subsequence of the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCursor {
    /// Next channel-local position to prefetch
    pub next: u32,
    /// Last channel-local position handed to the consumer
    pub last_dispatched: Option<u32>,
}

/// Next sample the worker should materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchCandidate {
    pub channel: Channel,
    pub local: u32,
    pub position: u32,
}

/// Tracks which channels are enabled
///
/// Cursors outlive enablement: disabling a channel and enabling it again
/// resumes from the same position, unless playback has moved past it in the
/// meantime (see [`join_at`](Self::join_at)).
#[derive(Debug)]
pub struct ActiveStreamRegistry {
    available: BTreeMap<StreamKind, StreamInfo>,
    active: BTreeMap<Channel, ActiveStreamInfo>,
    cursors: HashMap<Channel, ChannelCursor>,
}

impl ActiveStreamRegistry {
    pub fn new(available: BTreeMap<StreamKind, StreamInfo>) -> Self {
        Self {
            available,
            active: BTreeMap::new(),
            cursors: HashMap::new(),
        }
    }

    /// Fail with `StreamUnavailable` unless the recording has `stream`
    pub fn ensure_available(&self, stream: StreamKind) -> Result<&StreamInfo> {
        self.available
            .get(&stream)
            .ok_or(PlaybackError::StreamUnavailable { stream })
    }

    /// Enable a channel; returns whether anything changed
    pub fn enable(&mut self, channel: Channel) -> Result<bool> {
        let info = match channel {
            Channel::Stream(stream) => Some(self.ensure_available(stream)?.clone()),
            Channel::Motion => None,
        };
        if self.active.contains_key(&channel) {
            return Ok(false);
        }
        self.active.insert(
            channel,
            ActiveStreamInfo {
                channel,
                info,
                prefetched: 0,
            },
        );
        Ok(true)
    }

    /// Disable a channel; returns whether it was enabled
    pub fn disable(&mut self, channel: Channel) -> bool {
        self.active.remove(&channel).is_some()
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.active.contains_key(&channel)
    }

    pub fn active(&self) -> impl Iterator<Item = &ActiveStreamInfo> {
        self.active.values()
    }

    /// Enabled video streams
    pub fn enabled_streams(&self) -> Vec<StreamKind> {
        self.active
            .keys()
            .filter_map(|c| match c {
                Channel::Stream(stream) => Some(*stream),
                Channel::Motion => None,
            })
            .collect()
    }

    pub fn cursor(&self, channel: Channel) -> ChannelCursor {
        self.cursors.get(&channel).copied().unwrap_or_default()
    }

    pub fn set_cursor(&mut self, channel: Channel, cursor: ChannelCursor) {
        self.cursors.insert(channel, cursor);
    }

    /// Record that `local` was materialized
    pub fn advance(&mut self, channel: Channel, local: u32) {
        let cursor = self.cursors.entry(channel).or_default();
        cursor.next = cursor.next.max(local + 1);
        if let Some(active) = self.active.get_mut(&channel) {
            active.prefetched += 1;
        }
    }

    /// Move the prefetch cursor back to `local` if it is ahead
    pub fn rewind(&mut self, channel: Channel, local: u32) {
        let cursor = self.cursors.entry(channel).or_default();
        cursor.next = cursor.next.min(local);
    }

    /// Line up a freshly enabled channel with the playhead
    ///
    /// Samples captured before `playhead` were already passed by the other
    /// channels, so the cursor skips to the first one at or after it. A cursor
    /// already past that point is kept.
    pub fn join_at(&mut self, channel: Channel, index: &SampleIndex, playhead: Option<u64>) {
        let Some(playhead) = playhead else {
            return;
        };
        // nothing indexed at or after the playhead yet: every indexed sample is older
        let first = index
            .first_at_or_after(channel, playhead)
            .unwrap_or_else(|| index.channel_len(channel));
        let cursor = self.cursors.entry(channel).or_default();
        cursor.next = cursor.next.max(first);
    }

    /// Drop the cursors of disabled channels, e.g. after a seek moved the playhead
    pub fn forget_disabled(&mut self) {
        let active = &self.active;
        self.cursors.retain(|channel, _| active.contains_key(channel));
    }

    pub fn mark_dispatched(&mut self, channel: Channel, local: u32) {
        self.cursors.entry(channel).or_default().last_dispatched = Some(local);
    }

    /// Forget every cursor; playback restarts from the first sample
    pub fn reset_cursors(&mut self) {
        self.cursors.clear();
        for active in self.active.values_mut() {
            active.prefetched = 0;
        }
    }

    /// Earliest indexed sample not yet materialized across enabled channels
    pub fn next_candidate(&self, index: &SampleIndex) -> Option<PrefetchCandidate> {
        self.active
            .keys()
            .filter_map(|&channel| {
                let local = self.cursor(channel).next;
                index
                    .global_position(channel, local)
                    .map(|position| PrefetchCandidate {
                        channel,
                        local,
                        position,
                    })
            })
            .min_by_key(|c| c.position)
    }
}
