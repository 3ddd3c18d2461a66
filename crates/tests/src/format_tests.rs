//! Format versions, header queries and failure paths.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use config_loader::ConfigLoader;
use contracts::{CaptureMode, PlaybackConfig, PlaybackError, Sample, StreamKind};
use playback_engine::PlaybackEngine;
use recording_format::synth::synth_pixels;

use crate::fixtures::*;

#[test]
fn test_v1_recording_plays_like_v2() {
    let dir = tempfile::tempdir().unwrap();
    let v1_dir = dir.path().join("v1");
    let v2_dir = dir.path().join("v2");
    std::fs::create_dir_all(&v1_dir).unwrap();
    std::fs::create_dir_all(&v2_dir).unwrap();
    let streams = vec![depth(30), color(30)];
    let v1 = recording(&v1_dir, 1, streams.clone(), 6, 100, Vec::new());
    let v2 = recording(&v2_dir, 2, streams.clone(), 6, 100, Vec::new());

    let engine_v1 = PlaybackEngine::init(fast_config(&v1)).unwrap();
    let engine_v2 = PlaybackEngine::init(fast_config(&v2)).unwrap();
    assert_eq!(engine_v1.query_file_info().version, 1);
    assert_eq!(engine_v2.query_file_info().version, 2);

    let played_v1 = play_to_end(&engine_v1);
    let played_v2 = play_to_end(&engine_v2);
    assert_eq!(played_v1.keys(), played_v2.keys());

    for sample in played_v1.samples() {
        if let Sample::Frame(frame) = sample {
            let info = streams.iter().find(|s| s.profile.stream == frame.stream).unwrap();
            assert_eq!(frame.data.as_ref(), synth_pixels(&info.profile, frame.frame_number).as_slice());
            // v1 carries no per-frame metadata
            assert!(frame.metadata.is_empty());
        }
    }
}

#[test]
fn test_header_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30), color(60)], 10, 0, Vec::new());
    let engine = PlaybackEngine::init(PlaybackConfig::for_file(&path)).unwrap();

    let info = engine.query_file_info();
    assert_eq!(info.capture_mode, CaptureMode::Synced);
    assert_eq!(info.librealsense_version, "1.12.1.0");
    assert_eq!(engine.query_librealsense_version(), "1.12.1.0");
    assert_eq!(engine.query_sdk_version(), "10.0.0.1");

    assert_eq!(engine.query_streams().len(), 2);
    assert_eq!(engine.query_stream_info(StreamKind::Color).unwrap().profile.fps, 60);
    assert!(engine.query_stream_info(StreamKind::Infrared).is_err());
    assert_eq!(engine.query_number_of_frames(StreamKind::Depth).unwrap(), 10);
    assert_eq!(engine.get_properties().get("depth_units"), Some(&0.001));

    assert!(engine.is_realtime());
    engine.set_realtime(false);
    assert!(!engine.is_realtime());

    // depth spans 300 ms, color only 150 ms
    assert_eq!(engine.query_run_time(), 300_000);
    assert_eq!(engine.query_indexed_samples(), 20);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PlaybackEngine::init(PlaybackConfig::for_file(dir.path().join("absent.rscp")))
        .unwrap_err();
    assert!(matches!(err, PlaybackError::FileNotFound { .. }));
}

#[test]
fn test_unsupported_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    {
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(4)).unwrap();
        file.write_all(&7u32.to_le_bytes()).unwrap();
    }

    let err = PlaybackEngine::init(PlaybackConfig::for_file(&path)).unwrap_err();
    assert!(matches!(err, PlaybackError::UnsupportedFormatVersion { version: 7 }));
}

#[test]
fn test_not_a_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"just some text, not a capture").unwrap();

    let err = PlaybackEngine::init(PlaybackConfig::for_file(&path)).unwrap_err();
    assert!(matches!(err, PlaybackError::MalformedRecord { .. }));
}

#[test]
fn test_unknown_configured_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = depth_color_recording(dir.path());
    let mut config = fast_config(&path);
    config.streams.enabled = vec![StreamKind::Depth, StreamKind::Infrared2];

    let err = PlaybackEngine::init(config).unwrap_err();
    assert!(matches!(
        err,
        PlaybackError::StreamUnavailable {
            stream: StreamKind::Infrared2
        }
    ));
}

#[test]
fn test_trailing_garbage_ends_playback() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(dir.path(), 2, vec![depth(30)], 10, 0, Vec::new());
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xff; 8]).unwrap();
    }

    let engine = PlaybackEngine::init(fast_config(&path)).unwrap();
    let collector = play_to_end(&engine);
    assert_eq!(collector.frame_indices(StreamKind::Depth), (0..10).collect::<Vec<_>>());
    assert!(engine.index_error().is_some());
    assert!(engine.stats().index_complete);
}

#[test]
fn test_config_file_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    recording(dir.path(), 2, vec![depth(30), color(30)], 10, 100, Vec::new());
    let config_path = dir.path().join("playback.toml");
    std::fs::write(
        &config_path,
        r#"
file = "capture-v2.rscp"

[pacing]
realtime = false

[streams]
enabled = ["color"]
motion = false

[prefetch]
depth = 4
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_path(&config_path).unwrap();
    assert!(config.file.is_absolute() || config.file.starts_with(dir.path()));

    let engine = PlaybackEngine::init(config).unwrap();
    assert_eq!(engine.query_enabled_streams(), vec![StreamKind::Color]);
    assert!(!engine.is_motion_enabled());

    let collector = play_to_end(&engine);
    assert_eq!(collector.len(), 10);
    assert_eq!(collector.frame_indices(StreamKind::Color), (0..10).collect::<Vec<_>>());
}
