//! Synthetic recordings for demos and tests.
//!
//! Frames of every stream (and optional motion samples) are written in merged
//! capture order starting at t = 0, with deterministic pixel content.

use std::collections::BTreeMap;
use std::path::Path;

use contracts::{
    CameraInfo, CameraInfoField, Capability, CaptureMode, CompressionType, CoordinateSystem,
    Extrinsics, FileHeader, FrameMetadata, Intrinsics, MotionIntrinsics, MotionKind, MotionSample,
    PixelFormat, Properties, RecordingHeaders, Result, StreamInfo, StreamKind, StreamProfile,
    SwInfo, Version,
};
use tracing::info;

use crate::writer::{FrameWrite, RecordingWriter};

/// Metadata attribute id carrying the frame counter in synthetic recordings
pub const SYNTH_METADATA_COUNTER: u32 = 0;

/// Payload written in place of a frame marked corrupt
pub const CORRUPT_PAYLOAD: [u8; 2] = [0xde, 0xad];

/// Shape of a synthetic recording
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub version: u32,
    pub streams: Vec<StreamInfo>,
    /// Frames per stream
    pub frames: u32,
    /// Motion rate in Hz, alternating accel and gyro (0 = no motion)
    pub motion_hz: u32,
    /// Frames written with an undecodable payload, as (stream, frame index)
    pub corrupt: Vec<(StreamKind, u32)>,
}

/// What was written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthSummary {
    pub frames: BTreeMap<StreamKind, u32>,
    pub motion: u32,
    /// Capture time of the last sample (microseconds)
    pub last_capture_time: u64,
}

/// Stream description with a plausible pinhole model
pub fn stream_info(
    stream: StreamKind,
    width: u32,
    height: u32,
    fps: u32,
    format: PixelFormat,
    compression: CompressionType,
) -> StreamInfo {
    StreamInfo {
        profile: StreamProfile {
            stream,
            width,
            height,
            fps,
            format,
            intrinsics: Intrinsics {
                width,
                height,
                ppx: width as f32 / 2.0,
                ppy: height as f32 / 2.0,
                fx: width as f32,
                fy: width as f32,
                ..Intrinsics::default()
            },
        },
        extrinsics: Extrinsics::default(),
        depth_scale: if stream == StreamKind::Depth { 0.001 } else { 0.0 },
        compression,
        nframes: 0,
    }
}

/// Header set describing a synthetic device
pub fn synth_headers(version: u32, streams: &[StreamInfo]) -> RecordingHeaders {
    let mut camera_info = CameraInfo::new();
    camera_info.insert(CameraInfoField::DeviceName, "Synthetic Capture Device".into());
    camera_info.insert(CameraInfoField::SerialNumber, "000000000001".into());
    camera_info.insert(CameraInfoField::FirmwareVersion, "1.0.0.0".into());

    let mut capabilities: Vec<Capability> = streams
        .iter()
        .filter_map(|s| Capability::from_raw(s.profile.stream.to_raw()))
        .collect();
    capabilities.push(Capability::MotionEvents);

    let mut properties = Properties::new();
    properties.insert("depth_units".into(), 0.001);

    RecordingHeaders {
        header: FileHeader {
            version,
            coordinate_system: CoordinateSystem::RearDefault,
            capture_mode: CaptureMode::Synced,
            first_frame_offset: 0,
            nstreams: streams.len() as u32,
        },
        sw_info: SwInfo {
            sdk: Version::new(10, 0, 0, 1),
            librealsense: Version::new(1, 12, 1, 0),
        },
        streams: streams
            .iter()
            .map(|s| (s.profile.stream, s.clone()))
            .collect(),
        camera_info,
        capabilities,
        properties,
        motion_intrinsics: MotionIntrinsics {
            acc: contracts::MotionDeviceIntrinsics::identity(),
            gyro: contracts::MotionDeviceIntrinsics::identity(),
        },
    }
}

/// Deterministic pixels for frame `frame_number` of a stream
pub fn synth_pixels(profile: &StreamProfile, frame_number: u64) -> Vec<u8> {
    let size = profile.default_stride() as usize * profile.height as usize;
    let seed = (frame_number as usize).wrapping_mul(31) + profile.stream.to_raw() as usize * 7;
    (0..size).map(|i| ((i + seed) % 251) as u8).collect()
}

/// Capture time of frame `index` at `fps`
pub fn frame_time(index: u32, fps: u32) -> u64 {
    index as u64 * 1_000_000 / fps.max(1) as u64
}

/// Write a synthetic recording to `path`
pub fn write_synthetic(path: &Path, config: &SynthConfig) -> Result<SynthSummary> {
    let headers = synth_headers(config.version, &config.streams);
    let mut writer = RecordingWriter::create(path, &headers)?;

    // (capture time, order key, event) so ties keep stream order, motion last
    let mut events: Vec<(u64, u32, Event)> = Vec::new();
    for info in &config.streams {
        for i in 0..config.frames {
            let t = frame_time(i, info.profile.fps);
            events.push((t, info.profile.stream.to_raw(), Event::Frame(info.profile.stream, i)));
        }
    }
    if config.motion_hz > 0 {
        let span = config
            .streams
            .iter()
            .map(|s| frame_time(config.frames.saturating_sub(1), s.profile.fps))
            .max()
            .unwrap_or(0);
        let period = 1_000_000 / config.motion_hz as u64;
        let mut n = 0u64;
        while n * period <= span {
            events.push((n * period, u32::MAX, Event::Motion(n)));
            n += 1;
        }
    }
    events.sort_by_key(|(t, order, _)| (*t, *order));

    let mut summary = SynthSummary::default();
    for (t, _, event) in events {
        match event {
            Event::Frame(stream, i) => {
                let Some(info) = config.streams.iter().find(|s| s.profile.stream == stream) else {
                    continue;
                };
                let mut metadata = FrameMetadata::new();
                metadata.insert(SYNTH_METADATA_COUNTER, i as f64);
                let pixels = synth_pixels(&info.profile, i as u64);
                let frame = FrameWrite {
                    capture_time: t,
                    system_time: t,
                    frame_number: i as u64,
                    pixels: &pixels,
                    metadata: &metadata,
                };
                if config.corrupt.contains(&(stream, i)) {
                    writer.write_encoded_frame(stream, &frame, &CORRUPT_PAYLOAD)?;
                } else {
                    writer.write_frame(stream, &frame)?;
                }
                *summary.frames.entry(stream).or_insert(0) += 1;
            }
            Event::Motion(n) => {
                let kind = if n % 2 == 0 {
                    MotionKind::Accel
                } else {
                    MotionKind::Gyro
                };
                writer.write_motion(&MotionSample {
                    kind,
                    capture_time: t,
                    frame_number: n,
                    offset: 0,
                    data: [0.0, 0.0, 9.81],
                })?;
                summary.motion += 1;
            }
        }
        summary.last_capture_time = t;
    }

    writer.finish()?;
    info!(
        path = %path.display(),
        version = config.version,
        frames = ?summary.frames,
        motion = summary.motion,
        "Synthetic recording written"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Frame(StreamKind, u32),
    Motion(u64),
}
