//! Seek by index and by timestamp, and stream enable/disable around seeks.

use contracts::{Channel, PlaybackConfig, PlaybackError, Sample, StreamKind};
use playback_engine::PlaybackEngine;
use recording_format::synth::frame_time;

use crate::fixtures::*;

#[test]
fn test_seek_by_index_lands_on_requested_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    for i in (0..10).rev() {
        let frames = engine.set_frame_by_index(i, StreamKind::Depth).unwrap();
        assert_eq!(frames[&StreamKind::Depth].index, i);
        assert_eq!(frames[&StreamKind::Depth].capture_time, frame_time(i, 30));
        assert_eq!(frames[&StreamKind::Color].index, i);
        assert_eq!(engine.query_current_position(StreamKind::Depth).unwrap(), Some(i));
    }
}

#[test]
fn test_seek_by_index_out_of_range_leaves_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    engine.set_frame_by_index(3, StreamKind::Depth).unwrap();
    let err = engine.set_frame_by_index(10, StreamKind::Depth).unwrap_err();
    assert!(matches!(err, PlaybackError::SeekOutOfRange { .. }));
    assert_eq!(engine.query_current_position(StreamKind::Depth).unwrap(), Some(3));

    let err = engine.set_frame_by_index(0, StreamKind::Fisheye).unwrap_err();
    assert!(matches!(err, PlaybackError::StreamUnavailable { .. }));
}

#[test]
fn test_seek_by_index_resolves_other_streams_by_time() {
    let dir = tempfile::tempdir().unwrap();
    // color at half the depth rate
    let path = recording(dir.path(), 2, vec![depth(30), color(15)], 10, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let frames = engine.set_frame_by_index(6, StreamKind::Depth).unwrap();
    assert_eq!(frames[&StreamKind::Depth].capture_time, 200_000);
    // color frames at 0, 66_666, 133_333, 200_000, ...
    assert_eq!(frames[&StreamKind::Color].index, 3);
}

#[test]
fn test_playback_resumes_after_index_seek() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 10, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    // play through, then jump back
    let collector = Collector::attach(&engine);
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(1));
    collector.take_keys();

    engine.set_frame_by_index(2, StreamKind::Depth).unwrap();
    assert!(engine.is_paused());
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(2));
    assert_eq!(collector.frame_indices(StreamKind::Depth), (3..10).collect::<Vec<_>>());
}

#[test]
fn test_seek_by_timestamp_past_last_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    // 333 ms is within one frame period of the last frame (300 ms)
    let frames = engine.set_frame_by_time_stamp(333_000).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 9);
    assert_eq!(frames[&StreamKind::Color].index, 9);

    let err = engine.set_frame_by_time_stamp(400_000).unwrap_err();
    assert!(matches!(err, PlaybackError::SeekOutOfRange { .. }));
    assert_eq!(engine.query_current_position(StreamKind::Depth).unwrap(), Some(9));
}

#[test]
fn test_seek_by_timestamp_clamps_and_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 30, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let frames = engine.set_frame_by_time_stamp(0).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 0);

    // frames 1 and 2 are at 33_333 and 66_666 us
    let frames = engine.set_frame_by_time_stamp(49_999).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 1);
    let frames = engine.set_frame_by_time_stamp(60_000).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 2);
}

#[test]
fn test_seek_without_video_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 5, 100, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();
    engine.enable_stream(StreamKind::Depth, false).unwrap();

    let err = engine.set_frame_by_time_stamp(10_000).unwrap_err();
    assert!(matches!(err, PlaybackError::SeekOutOfRange { .. }));
}

#[test]
fn test_timestamp_seek_then_toggle_color() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 30, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    // nearest to 333 ms is frame 10 at 333_333 us
    let frames = engine.set_frame_by_time_stamp(333_000).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 10);
    assert_eq!(frames[&StreamKind::Color].index, 10);

    engine.enable_stream(StreamKind::Color, false).unwrap();
    assert_eq!(engine.query_current_position(StreamKind::Depth).unwrap(), Some(10));
    assert_eq!(engine.query_enabled_streams(), vec![StreamKind::Depth]);

    engine.enable_stream(StreamKind::Color, true).unwrap();
    assert_eq!(engine.query_current_position(StreamKind::Color).unwrap(), Some(10));

    let collector = play_to_end(&engine);
    assert_eq!(collector.frame_indices(StreamKind::Depth), (11..30).collect::<Vec<_>>());
    assert_eq!(collector.frame_indices(StreamKind::Color), (11..30).collect::<Vec<_>>());
}

#[test]
fn test_stream_reenabled_after_playback_moved_on() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 20, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    engine.set_frame_by_index(4, StreamKind::Depth).unwrap();
    engine.enable_stream(StreamKind::Color, false).unwrap();

    let collector = play_to_end(&engine);
    assert_eq!(collector.frame_indices(StreamKind::Depth), (5..20).collect::<Vec<_>>());
    assert!(collector.frame_indices(StreamKind::Color).is_empty());

    // color rejoins at the last delivered capture time, not where it stopped
    engine.pause();
    engine.enable_stream(StreamKind::Color, true).unwrap();
    collector.take_keys();
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(2));
    assert_eq!(collector.frame_indices(StreamKind::Color), vec![19]);
    assert!(collector.frame_indices(StreamKind::Depth).is_empty());
}

#[test]
fn test_stream_enabled_mid_playback_joins_at_playhead() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 20, 0, Vec::new());
    let mut config = PlaybackConfig::for_file(&path);
    config.streams.enabled = vec![StreamKind::Depth];
    let engine = PlaybackEngine::init(config).unwrap();

    let collector = Collector::attach(&engine);
    engine.resume().unwrap();
    assert!(collector.wait_samples(5));
    engine.pause();
    let last_depth = *collector.frame_indices(StreamKind::Depth).last().unwrap();
    assert!(last_depth < 19, "playback finished before the pause");

    engine.enable_stream(StreamKind::Color, true).unwrap();
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(1));

    let times: Vec<u64> = collector.keys().iter().map(|k| k.capture_time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "out of order: {times:?}");
    assert_eq!(collector.frame_indices(StreamKind::Depth), (0..20).collect::<Vec<_>>());
    assert_eq!(
        collector.frame_indices(StreamKind::Color),
        (last_depth..20).collect::<Vec<_>>()
    );
}

#[test]
fn test_seek_while_disabled_moves_rejoining_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 20, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    engine.set_frame_by_index(15, StreamKind::Depth).unwrap();
    engine.enable_stream(StreamKind::Color, false).unwrap();

    // frame 3 is captured at exactly 100 ms
    let frames = engine.set_frame_by_time_stamp(100_000).unwrap();
    assert_eq!(frames[&StreamKind::Depth].index, 3);
    assert!(!frames.contains_key(&StreamKind::Color));

    engine.enable_stream(StreamKind::Color, true).unwrap();
    assert_eq!(engine.query_current_position(StreamKind::Color).unwrap(), None);

    let collector = play_to_end(&engine);
    let times: Vec<u64> = collector.keys().iter().map(|k| k.capture_time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "out of order: {times:?}");
    assert_eq!(collector.frame_indices(StreamKind::Depth), (4..20).collect::<Vec<_>>());
    assert_eq!(collector.frame_indices(StreamKind::Color), (3..20).collect::<Vec<_>>());
}

#[test]
fn test_timestamp_seek_moves_motion_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 10, 100, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    engine.set_frame_by_time_stamp(100_000).unwrap();
    let collector = play_to_end(&engine);

    let first_motion = collector
        .samples()
        .into_iter()
        .find(|s| s.channel() == Channel::Motion)
        .map(|s| s.capture_time());
    assert_eq!(first_motion, Some(100_000));
    assert!(collector
        .samples()
        .iter()
        .all(|s| matches!(s, Sample::Motion(_)) || s.capture_time() > 100_000));
}
