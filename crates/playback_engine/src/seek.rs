//! Random access by frame index and by capture timestamp.

use std::collections::HashMap;

use contracts::{Channel, FrameSample, PlaybackError, Result, StreamKind};
use tracing::{info, instrument, warn};

use crate::engine::{PlaybackEngine, INDEX_SCAN_BATCH};
use crate::streams::ChannelCursor;

/// Where every channel lands after a seek
#[derive(Debug, Default)]
struct SeekTarget {
    /// Capture time the seek aimed at
    time: u64,
    /// Resolved frame per video stream
    frames: Vec<(StreamKind, u32)>,
    /// First motion sample to deliver afterwards
    motion: Option<u32>,
}

impl PlaybackEngine {
    /// Move `stream` to its `index`-th frame and every other enabled stream
    /// to the frame nearest in capture time
    ///
    /// Playback is left paused. Returns the resolved frame of each stream.
    #[instrument(name = "playback_seek_by_index", skip(self), fields(stream = %stream))]
    pub fn set_frame_by_index(
        &self,
        index: u32,
        stream: StreamKind,
    ) -> Result<HashMap<StreamKind, FrameSample>> {
        self.query_stream_info(stream)?;
        let channel = Channel::Stream(stream);
        let shared = &self.shared;

        shared.index_until(INDEX_SCAN_BATCH, |ix| ix.channel_len(channel) > index);
        let anchor_time = {
            let state = shared.lock_state();
            state.index.capture_time(channel, index)
        };
        let Some(anchor_time) = anchor_time else {
            observability::record_seek("index", false);
            return Err(PlaybackError::seek_out_of_range(format!(
                "{stream} has no frame {index}"
            )));
        };

        self.pause();
        let mut target = self.resolve(anchor_time, Some(stream));
        target.frames.push((stream, index));
        let frames = self.apply_seek(target);
        observability::record_seek("index", true);
        info!(index, anchor_time, "Seek by index");
        Ok(frames)
    }

    /// Move every enabled stream to the frame nearest to `timestamp` (us)
    ///
    /// Timestamps before the first frame clamp to it. Timestamps at or past
    /// one frame period after the last recorded frame are out of range.
    #[instrument(name = "playback_seek_by_time", skip(self))]
    pub fn set_frame_by_time_stamp(
        &self,
        timestamp: u64,
    ) -> Result<HashMap<StreamKind, FrameSample>> {
        let streams = self.query_enabled_streams();
        if streams.is_empty() {
            observability::record_seek("timestamp", false);
            return Err(PlaybackError::seek_out_of_range("no video stream is enabled"));
        }
        let period = streams
            .iter()
            .filter_map(|s| self.query_streams().get(s))
            .map(|info| frame_period(info.profile.fps))
            .max()
            .unwrap_or(0);

        let horizon = timestamp.saturating_add(period);
        let shared = &self.shared;
        shared.index_until(INDEX_SCAN_BATCH, |ix| {
            ix.samples()
                .last()
                .is_some_and(|s| s.descriptor.capture_time() >= horizon)
        });

        let reachable = {
            let state = shared.lock_state();
            let last = streams
                .iter()
                .filter_map(|s| state.index.last_capture_time(Channel::Stream(*s)))
                .max();
            match last {
                None => false,
                Some(last) => !state.index.is_complete() || timestamp < last.saturating_add(period),
            }
        };
        if !reachable {
            observability::record_seek("timestamp", false);
            return Err(PlaybackError::seek_out_of_range(format!(
                "timestamp {timestamp} us is past the end of the recording"
            )));
        }

        self.pause();
        let target = self.resolve(timestamp, None);
        let frames = self.apply_seek(target);
        observability::record_seek("timestamp", true);
        info!(timestamp, resolved = frames.len(), "Seek by timestamp");
        Ok(frames)
    }

    /// Nearest frame for every enabled stream except `skip`, plus the motion cursor
    fn resolve(&self, timestamp: u64, skip: Option<StreamKind>) -> SeekTarget {
        let shared = &self.shared;
        let (streams, motion_enabled) = {
            let state = shared.lock_state();
            (
                state.registry.enabled_streams(),
                state.registry.is_enabled(Channel::Motion),
            )
        };

        let mut target = SeekTarget {
            time: timestamp,
            ..Default::default()
        };
        for stream in streams.into_iter().filter(|s| Some(*s) != skip) {
            let channel = Channel::Stream(stream);
            shared.index_until(INDEX_SCAN_BATCH, |ix| {
                ix.first_at_or_after(channel, timestamp).is_some()
            });
            if let Some(local) = shared.lock_state().index.nearest(channel, timestamp) {
                target.frames.push((stream, local));
            }
        }

        if motion_enabled {
            // motion is capture ordered with everything else: once the index
            // reaches `timestamp`, later motion samples are not indexed yet
            shared.index_until(INDEX_SCAN_BATCH, |ix| {
                ix.samples()
                    .last()
                    .is_some_and(|s| s.descriptor.capture_time() >= timestamp)
            });
            let state = shared.lock_state();
            target.motion = Some(
                state
                    .index
                    .first_at_or_after(Channel::Motion, timestamp)
                    .unwrap_or_else(|| state.index.channel_len(Channel::Motion)),
            );
        }
        target
    }

    /// Drain buffered samples, place cursors and decode the resolved frames
    fn apply_seek(&self, target: SeekTarget) -> HashMap<StreamKind, FrameSample> {
        let shared = &self.shared;
        let descriptors: Vec<_> = {
            let mut state = shared.lock_state();
            state.buffer.clear();
            // disabled channels rejoin at the new playhead when enabled again
            state.registry.forget_disabled();
            state.playhead = Some(target.time);
            for &(stream, local) in &target.frames {
                state.registry.set_cursor(
                    Channel::Stream(stream),
                    ChannelCursor {
                        next: local + 1,
                        last_dispatched: Some(local),
                    },
                );
            }
            if let Some(next) = target.motion {
                state.registry.set_cursor(
                    Channel::Motion,
                    ChannelCursor {
                        next,
                        last_dispatched: next.checked_sub(1),
                    },
                );
            }
            state.pacing.reset();
            state.end_of_stream = false;
            state.generation += 1;
            observability::record_buffer_depth(0);

            target
                .frames
                .iter()
                .filter_map(|&(stream, local)| {
                    state
                        .index
                        .frame_at(stream, local)
                        .map(|frame| (local, frame.clone()))
                })
                .collect()
        };

        let mut payload = shared.lock_payload();
        let mut frames = HashMap::with_capacity(descriptors.len());
        for (local, descriptor) in descriptors {
            match payload.read_frame(&descriptor, local) {
                Ok(frame) => {
                    frames.insert(descriptor.stream, frame);
                }
                Err(e) => {
                    warn!(
                        stream = %descriptor.stream,
                        local,
                        error = %e,
                        "Resolved frame could not be decoded"
                    );
                }
            }
        }
        frames
    }
}

/// Frame period in microseconds (0 when the rate is unknown)
fn frame_period(fps: u32) -> u64 {
    if fps == 0 {
        0
    } else {
        1_000_000u64.div_ceil(fps as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(30), 33_334);
        assert_eq!(frame_period(60), 16_667);
        assert_eq!(frame_period(0), 0);
    }
}
