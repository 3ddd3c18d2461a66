//! Append-only sample index built by scanning the recording.

use std::collections::HashMap;

use contracts::{Channel, FrameDescriptor, SampleDescriptor, StreamKind};

/// One indexed sample and its position within its own channel
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSample {
    pub descriptor: SampleDescriptor,
    pub local: u32,
}

/// Capture-ordered sequence of sample descriptors
///
/// Entries are never modified or reordered once appended, so a position
/// handed out earlier stays valid for the whole session.
#[derive(Debug, Default)]
pub struct SampleIndex {
    samples: Vec<IndexedSample>,
    /// Global positions per channel, for every channel seen in the file
    channels: HashMap<Channel, Vec<u32>>,
    complete: bool,
}

impl SampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor, returning its global position
    pub fn push(&mut self, descriptor: SampleDescriptor) -> u32 {
        let position = self.samples.len() as u32;
        let positions = self.channels.entry(descriptor.channel()).or_default();
        let local = positions.len() as u32;
        positions.push(position);
        self.samples.push(IndexedSample { descriptor, local });
        position
    }

    /// No more records will be appended
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, position: u32) -> Option<&IndexedSample> {
        self.samples.get(position as usize)
    }

    pub fn samples(&self) -> &[IndexedSample] {
        &self.samples
    }

    /// Number of indexed samples of `channel`
    pub fn channel_len(&self, channel: Channel) -> u32 {
        self.channels.get(&channel).map_or(0, |p| p.len() as u32)
    }

    /// Global position of the `local`-th sample of `channel`
    pub fn global_position(&self, channel: Channel, local: u32) -> Option<u32> {
        self.channels
            .get(&channel)
            .and_then(|p| p.get(local as usize))
            .copied()
    }

    /// Descriptor of the `local`-th sample of `channel`
    pub fn sample_at(&self, channel: Channel, local: u32) -> Option<&SampleDescriptor> {
        self.global_position(channel, local)
            .and_then(|p| self.get(p))
            .map(|s| &s.descriptor)
    }

    /// Frame descriptor of the `local`-th frame of `stream`
    pub fn frame_at(&self, stream: StreamKind, local: u32) -> Option<&FrameDescriptor> {
        match self.sample_at(Channel::Stream(stream), local)? {
            SampleDescriptor::Frame(frame) => Some(frame),
            SampleDescriptor::Motion(_) => None,
        }
    }

    pub fn capture_time(&self, channel: Channel, local: u32) -> Option<u64> {
        self.sample_at(channel, local).map(|d| d.capture_time())
    }

    /// Last indexed sample of `channel`
    pub fn last_capture_time(&self, channel: Channel) -> Option<u64> {
        self.channel_len(channel)
            .checked_sub(1)
            .and_then(|last| self.capture_time(channel, last))
    }

    /// Local position of the first sample of `channel` captured at or after `ts`
    pub fn first_at_or_after(&self, channel: Channel, ts: u64) -> Option<u32> {
        let positions = self.channels.get(&channel)?;
        let local = positions
            .partition_point(|&p| self.samples[p as usize].descriptor.capture_time() < ts);
        (local < positions.len()).then_some(local as u32)
    }

    /// Local position of the sample of `channel` nearest to `ts`
    ///
    /// Ties resolve to the earlier sample.
    pub fn nearest(&self, channel: Channel, ts: u64) -> Option<u32> {
        let count = self.channel_len(channel);
        if count == 0 {
            return None;
        }
        let after = self.first_at_or_after(channel, ts).unwrap_or(count);
        if after == 0 {
            return Some(0);
        }
        let before = after - 1;
        if after == count {
            return Some(before);
        }
        let before_gap = ts - self.capture_time(channel, before)?;
        let after_gap = self.capture_time(channel, after)? - ts;
        Some(if after_gap < before_gap { after } else { before })
    }

    /// Capture span of the indexed samples
    pub fn capture_range(&self) -> Option<(u64, u64)> {
        let first = self.samples.iter().map(|s| s.descriptor.capture_time()).min()?;
        let last = self.samples.iter().map(|s| s.descriptor.capture_time()).max()?;
        Some((first, last))
    }
}
