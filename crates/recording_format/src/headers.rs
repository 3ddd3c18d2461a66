//! Header region parsing shared by every format version.

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::mem::size_of;

use contracts::{
    CameraInfo, Capability, CaptureMode, CoordinateSystem, CompressionType, DistortionModel,
    Extrinsics, FileHeader, Intrinsics, MotionDeviceIntrinsics, MotionIntrinsics, PixelFormat,
    PlaybackError, Properties, ReadSeek, RecordingHeaders, Result, StreamInfo, StreamKind,
    StreamProfile, SwInfo, Version,
};
use tracing::debug;

use crate::chunk::{read_bytes, read_pod, try_read_chunk_header, BodyReader};
use crate::layout::{
    ChunkId, FileHeaderRaw, MotionDeviceIntrinsicsRaw, MotionIntrinsicsRaw, StreamInfoRaw,
    SwInfoRaw, MAGIC,
};

/// Parser for the version-specific device info chunk
pub(crate) type DeviceInfoParser = fn(&[u8], u64) -> Result<CameraInfo>;

/// Read the fixed file header and check the magic
pub(crate) fn read_file_header(file: &mut dyn ReadSeek) -> Result<FileHeaderRaw> {
    file.seek(SeekFrom::Start(0))?;
    let raw: FileHeaderRaw = read_pod(file, "file header")?;
    let magic = raw.magic;
    if magic != MAGIC {
        return Err(PlaybackError::malformed(0, "bad magic bytes"));
    }
    Ok(raw)
}

/// Peek the format version of a recording, leaving the file at offset 0
pub fn read_format_version(file: &mut dyn ReadSeek) -> Result<u32> {
    let raw = read_file_header(file)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(raw.version)
}

/// Parse header and header chunks, leaving `file` at the first sample record
pub(crate) fn read_header_region(
    file: &mut dyn ReadSeek,
    version: u32,
    parse_device_info: DeviceInfoParser,
) -> Result<RecordingHeaders> {
    let raw = read_file_header(file)?;
    let raw_version = raw.version;
    if raw_version != version {
        return Err(PlaybackError::UnsupportedFormatVersion {
            version: raw_version,
        });
    }

    let coordinate_system = raw.coordinate_system;
    let capture_mode = raw.capture_mode;
    let first_frame_offset = raw.first_frame_offset;
    let nstreams = raw.nstreams;

    let header = FileHeader {
        version,
        coordinate_system: CoordinateSystem::from_raw(coordinate_system).ok_or_else(|| {
            PlaybackError::malformed(0, format!("unknown coordinate system {coordinate_system}"))
        })?,
        capture_mode: CaptureMode::from_raw(capture_mode).unwrap_or_default(),
        first_frame_offset,
        nstreams,
    };

    let mut headers = RecordingHeaders {
        header,
        sw_info: SwInfo::default(),
        streams: BTreeMap::new(),
        camera_info: CameraInfo::new(),
        capabilities: Vec::new(),
        properties: Properties::new(),
        motion_intrinsics: MotionIntrinsics::default(),
    };

    loop {
        let offset = file.stream_position()?;
        if offset >= first_frame_offset {
            break;
        }
        let Some((id, size)) = try_read_chunk_header(file)? else {
            return Err(PlaybackError::malformed(offset, "header region ends early"));
        };
        let body_offset = offset + 8;
        let body = read_bytes(file, size as usize, "header chunk")?;

        match id {
            ChunkId::DeviceInfo => {
                headers.camera_info = parse_device_info(&body, body_offset)?;
            }
            ChunkId::SwInfo => {
                let sw: SwInfoRaw = BodyReader::new(&body, body_offset).pod()?;
                headers.sw_info = convert_sw_info(&sw);
            }
            ChunkId::StreamInfo => {
                headers.streams = parse_stream_infos(&body, body_offset)?;
            }
            ChunkId::Properties => {
                headers.properties = parse_properties(&body, body_offset)?;
            }
            ChunkId::Capabilities => {
                headers.capabilities = parse_capabilities(&body, body_offset)?;
            }
            ChunkId::MotionIntrinsics => {
                let mi: MotionIntrinsicsRaw = BodyReader::new(&body, body_offset).pod()?;
                headers.motion_intrinsics = MotionIntrinsics {
                    acc: convert_motion_device(&mi.acc),
                    gyro: convert_motion_device(&mi.gyro),
                };
            }
            other => {
                return Err(PlaybackError::malformed(
                    offset,
                    format!("{other:?} chunk inside header region"),
                ));
            }
        }
    }

    if headers.streams.len() != nstreams as usize {
        return Err(PlaybackError::malformed(
            0,
            format!(
                "header announces {nstreams} streams, found {}",
                headers.streams.len()
            ),
        ));
    }

    file.seek(SeekFrom::Start(first_frame_offset))?;
    debug!(
        version,
        streams = headers.streams.len(),
        first_frame_offset,
        "Parsed recording headers"
    );
    Ok(headers)
}

fn convert_sw_info(raw: &SwInfoRaw) -> SwInfo {
    let (sdk, lrs) = (raw.sdk, raw.librealsense);
    SwInfo {
        sdk: Version::new(sdk[0], sdk[1], sdk[2], sdk[3]),
        librealsense: Version::new(lrs[0], lrs[1], lrs[2], lrs[3]),
    }
}

fn convert_motion_device(raw: &MotionDeviceIntrinsicsRaw) -> MotionDeviceIntrinsics {
    let d = raw.data;
    MotionDeviceIntrinsics {
        data: [
            [d[0], d[1], d[2], d[3]],
            [d[4], d[5], d[6], d[7]],
            [d[8], d[9], d[10], d[11]],
        ],
        noise_variances: raw.noise_variances,
        bias_variances: raw.bias_variances,
    }
}

fn parse_stream_infos(body: &[u8], base: u64) -> Result<BTreeMap<StreamKind, StreamInfo>> {
    if body.len() % size_of::<StreamInfoRaw>() != 0 {
        return Err(PlaybackError::malformed(base, "stream info chunk size"));
    }
    let mut reader = BodyReader::new(body, base);
    let mut streams = BTreeMap::new();
    while reader.remaining() > 0 {
        let raw: StreamInfoRaw = reader.pod()?;
        let info = convert_stream_info(&raw, base)?;
        streams.insert(info.profile.stream, info);
    }
    Ok(streams)
}

fn convert_stream_info(raw: &StreamInfoRaw, base: u64) -> Result<StreamInfo> {
    let (stream_id, format_id, compression_id) = (raw.stream, raw.format, raw.compression);
    let stream = StreamKind::from_raw(stream_id)
        .ok_or_else(|| PlaybackError::malformed(base, format!("unknown stream id {stream_id}")))?;
    let format = PixelFormat::from_raw(format_id)
        .ok_or_else(|| PlaybackError::malformed(base, format!("unknown pixel format {format_id}")))?;
    let compression = CompressionType::from_raw(compression_id).ok_or_else(|| {
        PlaybackError::malformed(base, format!("unknown compression {compression_id}"))
    })?;

    let (width, height) = (raw.width, raw.height);
    Ok(StreamInfo {
        profile: StreamProfile {
            stream,
            width,
            height,
            fps: raw.fps,
            format,
            intrinsics: Intrinsics {
                width,
                height,
                ppx: raw.ppx,
                ppy: raw.ppy,
                fx: raw.fx,
                fy: raw.fy,
                model: DistortionModel::from_raw(raw.model),
                coeffs: raw.coeffs,
            },
        },
        extrinsics: Extrinsics {
            rotation: raw.rotation,
            translation: raw.translation,
        },
        depth_scale: raw.depth_scale,
        compression,
        nframes: raw.nframes,
    })
}

fn parse_properties(body: &[u8], base: u64) -> Result<Properties> {
    let mut reader = BodyReader::new(body, base);
    let count = reader.u32()?;
    let mut properties = Properties::new();
    for _ in 0..count {
        let key = reader.string()?;
        let value = reader.f64()?;
        properties.insert(key, value);
    }
    Ok(properties)
}

fn parse_capabilities(body: &[u8], base: u64) -> Result<Vec<Capability>> {
    let mut reader = BodyReader::new(body, base);
    let count = reader.u32()?;
    let mut caps = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let raw = reader.u32()?;
        // Capabilities newer than this build are ignored
        if let Some(cap) = Capability::from_raw(raw) {
            caps.push(cap);
        }
    }
    Ok(caps)
}
