//! Bounded buffer of materialized samples awaiting dispatch.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (capture time + index position + slab key)
//! - Slab stores the decoded samples
//!
//! Decoded images never move while the buffer is reordered.

use std::fmt;

use contracts::{Channel, Sample};
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// A sample read and decoded ahead of its delivery time
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchedSample {
    /// Position in the sample index (global capture order)
    pub position: u32,
    /// Position within the sample's own channel
    pub local: u32,
    pub sample: Sample,
}

impl PrefetchedSample {
    pub fn capture_time(&self) -> u64 {
        self.sample.capture_time()
    }

    pub fn channel(&self) -> Channel {
        self.sample.channel()
    }
}

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct SampleMeta {
    capture_time: u64,
    /// Tie-breaker for equal capture times
    position: u32,
    channel: Channel,
    local: u32,
    slab_key: usize,
}

impl SampleMeta {
    fn order_key(&self) -> (u64, u32) {
        (self.capture_time, self.position)
    }
}

/// Global prefetch buffer shared by all enabled channels
///
/// Unlike a per-sensor ring, a full buffer rejects pushes instead of
/// overwriting: every prefetched sample must eventually be dispatched or
/// explicitly discarded.
pub struct PrefetchBuffer {
    index: HeapRb<SampleMeta>,
    storage: Slab<PrefetchedSample>,
    capacity: usize,
}

impl fmt::Debug for PrefetchBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchBuffer")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl PrefetchBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1)
    #[inline]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, handing it back if the buffer is full
    #[inline]
    pub fn push(&mut self, sample: PrefetchedSample) -> Result<(), PrefetchedSample> {
        if self.index.is_full() {
            return Err(sample);
        }
        let meta = SampleMeta {
            capture_time: sample.capture_time(),
            position: sample.position,
            channel: sample.channel(),
            local: sample.local,
            slab_key: 0,
        };
        let slab_key = self.storage.insert(sample);
        let _ = self.index.try_push(SampleMeta { slab_key, ..meta });
        Ok(())
    }

    /// Peek at the earliest sample (by capture time) without removing
    #[inline]
    pub fn peek(&self) -> Option<&PrefetchedSample> {
        self.index
            .iter()
            .min_by_key(|m| m.order_key())
            .and_then(|meta| self.storage.get(meta.slab_key))
    }

    /// Remove and return the earliest sample (by capture time)
    #[inline]
    pub fn pop(&mut self) -> Option<PrefetchedSample> {
        let min_idx = self
            .index
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.order_key())
            .map(|(i, _)| i)?;

        // Collect all metadata, remove target, rebuild index
        let mut metas: Vec<SampleMeta> = self.index.pop_iter().collect();
        let removed = metas.remove(min_idx);
        for m in metas {
            let _ = self.index.try_push(m);
        }

        Some(self.storage.remove(removed.slab_key))
    }

    /// Drop every buffered sample of `channel`
    ///
    /// Returns the smallest channel-local position removed, so the caller can
    /// roll the channel cursor back.
    pub fn remove_channel(&mut self, channel: Channel) -> Option<u32> {
        let mut first_removed: Option<u32> = None;
        let remaining: Vec<SampleMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.channel == channel {
                    self.storage.remove(m.slab_key);
                    first_removed = Some(first_removed.map_or(m.local, |f| f.min(m.local)));
                    false
                } else {
                    true
                }
            })
            .collect();

        for m in remaining {
            let _ = self.index.try_push(m);
        }
        first_removed
    }

    /// Number of buffered samples of `channel`
    pub fn count_for(&self, channel: Channel) -> usize {
        self.index.iter().filter(|m| m.channel == channel).count()
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.index.clear();
        self.storage.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.index.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MotionKind, MotionSample};

    fn make_sample(position: u32, capture_time: u64) -> PrefetchedSample {
        PrefetchedSample {
            position,
            local: position,
            sample: Sample::Motion(MotionSample {
                kind: MotionKind::Accel,
                capture_time,
                frame_number: position as u64,
                offset: 0,
                data: [0.0; 3],
            }),
        }
    }

    #[test]
    fn test_buffer_pop_order() {
        let mut buffer = PrefetchBuffer::new(10);

        buffer.push(make_sample(2, 300)).unwrap();
        buffer.push(make_sample(0, 100)).unwrap();
        buffer.push(make_sample(1, 200)).unwrap();

        assert_eq!(buffer.peek().unwrap().capture_time(), 100);
        assert_eq!(buffer.pop().unwrap().capture_time(), 100);
        assert_eq!(buffer.pop().unwrap().capture_time(), 200);
        assert_eq!(buffer.pop().unwrap().capture_time(), 300);
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn test_buffer_equal_times_keep_index_order() {
        let mut buffer = PrefetchBuffer::new(4);

        buffer.push(make_sample(5, 100)).unwrap();
        buffer.push(make_sample(4, 100)).unwrap();

        assert_eq!(buffer.pop().unwrap().position, 4);
        assert_eq!(buffer.pop().unwrap().position, 5);
    }

    #[test]
    fn test_buffer_full_rejects() {
        let mut buffer = PrefetchBuffer::new(2);

        buffer.push(make_sample(0, 1)).unwrap();
        buffer.push(make_sample(1, 2)).unwrap();
        assert!(buffer.is_full());

        let rejected = buffer.push(make_sample(2, 3)).unwrap_err();
        assert_eq!(rejected.position, 2);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_remove_channel() {
        let mut buffer = PrefetchBuffer::new(8);
        buffer.push(make_sample(3, 30)).unwrap();
        buffer.push(make_sample(1, 10)).unwrap();

        assert_eq!(buffer.count_for(Channel::Motion), 2);
        assert_eq!(buffer.remove_channel(Channel::Motion), Some(1));
        assert!(buffer.is_empty());
        assert_eq!(buffer.remove_channel(Channel::Motion), None);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let buffer = PrefetchBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }
}
