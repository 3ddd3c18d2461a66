//! End-to-end playback: ordering, pacing, pause/resume, reset and drops.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Channel, PlaybackConfig, Sample, StreamKind};
use observability::PlaybackMetricsAggregator;
use playback_engine::PlaybackEngine;
use recording_format::synth::synth_pixels;

use crate::fixtures::*;

#[test]
fn test_delivers_every_sample_in_capture_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(15)], 10, 200, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let collector = play_to_end(&engine);
    let samples = collector.samples();

    let times: Vec<u64> = samples.iter().map(Sample::capture_time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "out of order: {times:?}");

    assert_eq!(collector.frame_indices(StreamKind::Depth), (0..10).collect::<Vec<_>>());
    assert_eq!(collector.frame_indices(StreamKind::Color), (0..10).collect::<Vec<_>>());
    // color spans 600 ms, motion covers it at 5 ms intervals
    let motion = samples
        .iter()
        .filter(|s| s.channel() == Channel::Motion)
        .count();
    assert_eq!(motion, 121);

    let stats = engine.stats();
    assert!(stats.end_of_stream);
    assert!(stats.index_complete);
    assert_eq!(stats.counters.dispatched_frames, 20);
    assert_eq!(stats.counters.dispatched_motion, 121);
    assert_eq!(stats.buffered, 0);
    assert_eq!(stats.channels["depth"].prefetched, 10);
    assert_eq!(stats.channels["motion"].prefetched, 121);
    assert!(stats.channels.values().all(|c| c.buffered == 0));
}

#[test]
fn test_decoded_pixels_match_recording() {
    let dir = tempfile::tempdir().unwrap();
    let streams = vec![depth(30), color(30)];
    let path = recording(dir.path(), 2, streams.clone(), 5, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let collector = play_to_end(&engine);
    for sample in collector.samples() {
        let Sample::Frame(frame) = sample else {
            panic!("unexpected motion sample");
        };
        let info = streams
            .iter()
            .find(|s| s.profile.stream == frame.stream)
            .unwrap();
        assert_eq!(frame.data.len(), (frame.stride * frame.height) as usize);
        assert_eq!(
            frame.data.as_ref(),
            synth_pixels(&info.profile, frame.frame_number).as_slice(),
            "{} frame {}",
            frame.stream,
            frame.index
        );
        assert_eq!(frame.metadata.get(&0), Some(&(frame.index as f64)));
    }
}

#[test]
fn test_index_batch_does_not_change_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(60)], 12, 100, Vec::new());

    let mut sequences = Vec::new();
    for batch in [1, 3, 64] {
        let mut config = fast_config(&path);
        config.prefetch.index_batch = batch;
        let engine = PlaybackEngine::init(config).unwrap();
        sequences.push(play_to_end(&engine).keys());
    }

    assert!(!sequences[0].is_empty());
    assert_eq!(sequences[0], sequences[1]);
    assert_eq!(sequences[0], sequences[2]);
}

#[test]
fn test_small_prefetch_depth_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 10, 100, Vec::new());

    let baseline = play_to_end(&PlaybackEngine::init(fast_config(&path)).unwrap()).keys();

    let mut config = fast_config(&path);
    config.prefetch.depth = 1;
    let engine = PlaybackEngine::init(config).unwrap();
    assert_eq!(play_to_end(&engine).keys(), baseline);
}

#[test]
fn test_realtime_pacing_follows_capture_span() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 10, 0, Vec::new());

    let mut config = PlaybackConfig::for_file(&path);
    config.pacing.speed = 2.0;
    let engine = PlaybackEngine::init(config).unwrap();

    let started = Instant::now();
    let collector = play_to_end(&engine);
    let elapsed = started.elapsed();

    assert_eq!(collector.len(), 10);
    // 300 ms of capture at double speed
    assert!(elapsed >= Duration::from_millis(145), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "too slow: {elapsed:?}");
}

#[test]
fn test_pause_resume_preserves_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 10, 100, Vec::new());

    let expected = play_to_end(&PlaybackEngine::init(fast_config(&path)).unwrap()).keys();

    // realtime run, paused part-way through
    let engine = PlaybackEngine::init(PlaybackConfig::for_file(&path)).unwrap();
    let collector = Collector::attach(&engine);
    engine.resume().unwrap();
    assert!(collector.wait_samples(8));
    engine.pause();
    assert!(engine.is_paused());

    let delivered = collector.len();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(collector.len(), delivered, "delivery continued while paused");

    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(1));
    assert_eq!(collector.keys(), expected);
}

#[test]
fn test_pause_from_sample_callback() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let engine = Arc::new(PlaybackEngine::init(fast_config(&path)).unwrap());

    let delivered = Arc::new(AtomicUsize::new(0));
    let weak = Arc::downgrade(&engine);
    let counter = Arc::clone(&delivered);
    engine.set_sample_callback(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 5 {
            if let Some(engine) = weak.upgrade() {
                engine.pause();
            }
        }
    });

    engine.resume().unwrap();
    let deadline = Instant::now() + WAIT;
    while !engine.is_paused() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    std::thread::sleep(Duration::from_millis(20));
    assert!(engine.is_paused());
    assert_eq!(delivered.load(Ordering::SeqCst), 5);

    let collector = Collector::attach(&engine);
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(1));
    assert_eq!(collector.len(), 15);
}

#[test]
fn test_reset_replays_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(
        dir.path(),
        2,
        vec![depth(30), color(30)],
        10,
        100,
        vec![(StreamKind::Color, 3)],
    );
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let collector = play_to_end(&engine);
    let first = collector.take_keys();
    let first_drops = (
        engine.query_frame_drop_count(StreamKind::Depth),
        engine.query_frame_drop_count(StreamKind::Color),
        engine.query_imu_drop_count(),
    );
    assert_eq!(first_drops, (0, 1, 0));

    engine.reset();
    assert!(engine.is_paused());
    assert_eq!(engine.query_frame_drop_count(StreamKind::Color), 0);
    assert_eq!(engine.query_current_position(StreamKind::Depth).unwrap(), None);

    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(2));
    assert_eq!(collector.take_keys(), first);
    assert_eq!(
        (
            engine.query_frame_drop_count(StreamKind::Depth),
            engine.query_frame_drop_count(StreamKind::Color),
            engine.query_imu_drop_count(),
        ),
        first_drops
    );
}

#[test]
fn test_decode_failure_skips_frame_and_counts_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 10, 0, vec![(StreamKind::Depth, 5)]);
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let collector = play_to_end(&engine);
    assert_eq!(
        collector.frame_indices(StreamKind::Depth),
        vec![0, 1, 2, 3, 4, 6, 7, 8, 9]
    );
    assert_eq!(engine.query_frame_drop_count(StreamKind::Depth), 1);

    let stats = engine.stats();
    assert_eq!(stats.counters.decode_failures, 1);
    assert_eq!(stats.counters.decoded_frames, 9);
    assert_eq!(stats.counters.dispatched_frames, 9);
}

#[test]
fn test_consumer_drop_counts_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    engine.update_frame_drop_count(StreamKind::Depth, 2).unwrap();
    engine.update_frame_drop_count(StreamKind::Depth, 3).unwrap();
    engine.update_imu_drop_count(4);
    assert!(engine.update_frame_drop_count(StreamKind::Fisheye, 1).is_err());

    assert_eq!(engine.query_frame_drop_count(StreamKind::Depth), 5);
    assert_eq!(engine.query_frame_drop_count(StreamKind::Color), 0);
    assert_eq!(engine.query_imu_drop_count(), 4);
    assert_eq!(engine.stats().drops.total_frames(), 5);
}

#[test]
fn test_motion_toggle() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 4, 100, Vec::new());

    let mut config = fast_config(&path);
    config.streams.motion = false;
    let engine = PlaybackEngine::init(config).unwrap();
    assert!(!engine.is_motion_enabled());
    let collector = play_to_end(&engine);
    assert!(collector.samples().iter().all(|s| s.channel() != Channel::Motion));
    assert_eq!(collector.len(), 4);

    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();
    engine.enable_stream(StreamKind::Depth, false).unwrap();
    let collector = play_to_end(&engine);
    assert!(collector.samples().iter().all(|s| s.channel() == Channel::Motion));
    assert_eq!(collector.len(), 11);
}

#[test]
fn test_metrics_aggregator_over_playback() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(30)], 10, 0, Vec::new());
    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();

    let mut metrics = PlaybackMetricsAggregator::new();
    for sample in play_to_end(&engine).samples() {
        metrics.update(&sample);
    }

    let summary = metrics.summary();
    assert_eq!(summary.total_frames, 20);
    assert_eq!(summary.channel_counts.get("depth"), Some(&10));
    let interval = &summary.interval_ms["color"];
    assert_eq!(interval.count, 9);
    assert!((interval.mean - 33.333).abs() < 0.01);
}
