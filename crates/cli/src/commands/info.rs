//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{
    CameraInfo, Capability, CompressionType, CoordinateSystem, FileInfo, MotionIntrinsics,
    PixelFormat, PlaybackConfig, Properties,
};
use playback_engine::PlaybackEngine;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Recording info for JSON output
#[derive(Serialize)]
struct RecordingInfo {
    file: String,
    #[serde(flatten)]
    file_info: FileInfo,
    coordinate_system: CoordinateSystem,
    camera_info: CameraInfo,
    capabilities: Vec<Capability>,
    properties: Properties,
    streams: Vec<StreamSummary>,
    motion_intrinsics: MotionIntrinsics,
    #[serde(skip_serializing_if = "Option::is_none")]
    scan: Option<ScanSummary>,
}

#[derive(Serialize)]
struct StreamSummary {
    stream: String,
    width: u32,
    height: u32,
    fps: u32,
    format: PixelFormat,
    compression: CompressionType,
    depth_scale: f32,
    /// Frames recorded in the header, or counted while indexing
    frames: u32,
}

#[derive(Serialize)]
struct ScanSummary {
    samples: usize,
    run_time_us: u64,
    frames: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_error: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(recording = %args.recording.display(), "Reading recording info");

    if !args.recording.exists() {
        return Err(CliError::recording_not_found(&args.recording).into());
    }

    let engine = PlaybackEngine::init(PlaybackConfig::for_file(&args.recording))
        .with_context(|| format!("Failed to open recording {}", args.recording.display()))?;
    let info = build_recording_info(&engine, args)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize recording info")?;
        println!("{}", json);
    } else {
        print_recording_info(&info);
    }

    Ok(())
}

fn build_recording_info(engine: &PlaybackEngine, args: &InfoArgs) -> Result<RecordingInfo> {
    // run time indexes the whole file, so counts below see every frame
    let scan = if args.scan {
        let run_time_us = engine.query_run_time();
        let mut frames = BTreeMap::new();
        for stream in engine.query_streams().keys() {
            frames.insert(stream.to_string(), engine.query_number_of_frames(*stream)?);
        }
        Some(ScanSummary {
            samples: engine.query_indexed_samples(),
            run_time_us,
            frames,
            index_error: engine.index_error(),
        })
    } else {
        None
    };

    let streams = engine
        .query_streams()
        .iter()
        .map(|(stream, info)| {
            Ok(StreamSummary {
                stream: stream.to_string(),
                width: info.profile.width,
                height: info.profile.height,
                fps: info.profile.fps,
                format: info.profile.format,
                compression: info.compression,
                depth_scale: info.depth_scale,
                frames: engine.query_number_of_frames(*stream)?,
            })
        })
        .collect::<contracts::Result<Vec<_>>>()?;

    Ok(RecordingInfo {
        file: args.recording.display().to_string(),
        file_info: engine.query_file_info(),
        coordinate_system: engine.query_coordinate_system(),
        camera_info: engine.get_camera_info().clone(),
        capabilities: engine.get_capabilities().to_vec(),
        properties: engine.get_properties(),
        streams,
        motion_intrinsics: *engine.get_motion_intrinsics(),
        scan,
    })
}

fn print_recording_info(info: &RecordingInfo) {
    println!("\n=== Recording Information ===\n");
    println!("File: {}", info.file);
    println!("  Format version: {}", info.file_info.version);
    println!("  Capture mode: {:?}", info.file_info.capture_mode);
    println!("  Coordinate system: {:?}", info.coordinate_system);
    println!("  SDK version: {}", info.file_info.sdk_version);
    println!("  librealsense version: {}", info.file_info.librealsense_version);

    if !info.camera_info.is_empty() {
        println!("\nDevice:");
        for (field, value) in &info.camera_info {
            println!("  {:?}: {}", field, value);
        }
    }

    println!("\nStreams ({}):", info.streams.len());
    for stream in &info.streams {
        println!(
            "  - {} {}x{} @ {} fps, {} ({:?}), {} frames",
            stream.stream,
            stream.width,
            stream.height,
            stream.fps,
            stream.format,
            stream.compression,
            stream.frames
        );
        if stream.depth_scale > 0.0 {
            println!("      depth scale: {}", stream.depth_scale);
        }
    }

    if !info.capabilities.is_empty() {
        let names: Vec<String> = info.capabilities.iter().map(|c| format!("{:?}", c)).collect();
        println!("\nCapabilities: {}", names.join(", "));
    }

    if !info.properties.is_empty() {
        println!("\nProperties:");
        for (name, value) in &info.properties {
            println!("  {}: {}", name, value);
        }
    }

    if let Some(ref scan) = info.scan {
        println!("\nScan:");
        println!("  Samples: {}", scan.samples);
        println!("  Run time: {:.3} s", scan.run_time_us as f64 / 1_000_000.0);
        for (stream, frames) in &scan.frames {
            println!("  {}: {} frames", stream, frames);
        }
        if let Some(ref error) = scan.index_error {
            println!("  Indexing stopped early: {}", error);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamKind;
    use recording_format::synth::{stream_info, write_synthetic, SynthConfig};

    #[test]
    fn test_build_info_with_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.rscp");
        write_synthetic(
            &path,
            &SynthConfig {
                version: 2,
                streams: vec![stream_info(
                    StreamKind::Depth,
                    4,
                    2,
                    30,
                    PixelFormat::Z16,
                    CompressionType::Deflate,
                )],
                frames: 10,
                motion_hz: 100,
                corrupt: Vec::new(),
            },
        )
        .unwrap();

        let engine = PlaybackEngine::init(PlaybackConfig::for_file(&path)).unwrap();
        let args = InfoArgs {
            recording: path,
            json: true,
            scan: true,
        };
        let info = build_recording_info(&engine, &args).unwrap();

        assert_eq!(info.file_info.version, 2);
        assert_eq!(info.streams.len(), 1);
        assert_eq!(info.streams[0].frames, 10);
        let scan = info.scan.as_ref().unwrap();
        assert_eq!(scan.run_time_us, 300_000);
        assert_eq!(scan.frames.get("depth"), Some(&10));
        assert!(scan.index_error.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["streams"][0]["stream"], "depth");
    }
}
