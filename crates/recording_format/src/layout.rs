//! On-disk layout of `.rscp` capture recordings.
//!
//! ```text
//! FileHeaderRaw
//! chunk*            header chunks, up to `first_frame_offset`
//! sample*           SampleInfo, then FrameInfo + ImageData (+ FrameMetadata, v2)
//!                   or MotionData
//! ```
//!
//! Every chunk starts with a [`ChunkHeader`]. All integers are little-endian.

use bytemuck::{Pod, Zeroable};

/// Magic bytes at the start of every recording
pub const MAGIC: [u8; 4] = *b"RSCP";

/// Legacy layout
pub const FORMAT_V1: u32 = 1;
/// Current layout
pub const FORMAT_V2: u32 = 2;

/// Pitches block ahead of every v2 image payload (four plane pitches)
pub const V2_PITCHES_SIZE: usize = 16;

/// Fixed-size name fields of the legacy device info chunk
pub const V1_NAME_LEN: usize = 256;
pub const V1_SERIAL_LEN: usize = 32;
pub const V1_FIRMWARE_LEN: usize = 32;

/// Chunk identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChunkId {
    DeviceInfo = 1,
    SwInfo = 2,
    StreamInfo = 3,
    Properties = 4,
    Capabilities = 5,
    MotionIntrinsics = 6,
    SampleInfo = 10,
    FrameInfo = 11,
    ImageData = 12,
    FrameMetadata = 13,
    MotionData = 14,
}

impl ChunkId {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::DeviceInfo,
            2 => Self::SwInfo,
            3 => Self::StreamInfo,
            4 => Self::Properties,
            5 => Self::Capabilities,
            6 => Self::MotionIntrinsics,
            10 => Self::SampleInfo,
            11 => Self::FrameInfo,
            12 => Self::ImageData,
            13 => Self::FrameMetadata,
            14 => Self::MotionData,
            _ => return None,
        })
    }
}

/// Sample kinds stored in `SampleInfoRaw::kind`
pub const SAMPLE_KIND_FRAME: u32 = 0;
pub const SAMPLE_KIND_MOTION: u32 = 1;

/// Motion kinds stored in `MotionData*::kind`
pub const MOTION_KIND_ACCEL: u32 = 0;
pub const MOTION_KIND_GYRO: u32 = 1;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FileHeaderRaw {
    pub magic: [u8; 4],
    pub version: u32,
    pub coordinate_system: u32,
    /// Unused by v1
    pub capture_mode: u32,
    pub first_frame_offset: u64,
    pub nstreams: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ChunkHeader {
    pub id: u32,
    pub size: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwInfoRaw {
    pub sdk: [u32; 4],
    pub librealsense: [u32; 4],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StreamInfoRaw {
    pub stream: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: u32,
    pub ppx: f32,
    pub ppy: f32,
    pub fx: f32,
    pub fy: f32,
    pub model: u32,
    pub coeffs: [f32; 5],
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
    pub depth_scale: f32,
    pub compression: u32,
    pub nframes: u32,
}

/// Legacy device description with fixed, NUL-padded strings
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DeviceInfoV1Raw {
    pub name: [u8; V1_NAME_LEN],
    pub serial: [u8; V1_SERIAL_LEN],
    pub firmware: [u8; V1_FIRMWARE_LEN],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionDeviceIntrinsicsRaw {
    pub data: [f32; 12],
    pub noise_variances: [f32; 3],
    pub bias_variances: [f32; 3],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionIntrinsicsRaw {
    pub acc: MotionDeviceIntrinsicsRaw,
    pub gyro: MotionDeviceIntrinsicsRaw,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SampleInfoRaw {
    pub kind: u32,
    /// Stream id for frames, motion kind for motion samples
    pub channel: u32,
}

/// Legacy frame info: stride in pixels, bytes-per-pixel as float, timestamp in ms
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameInfoV1Raw {
    pub width: u32,
    pub height: u32,
    pub stride_x: u32,
    pub bpp: f32,
    pub format: u32,
    pub frame_number: u64,
    pub system_time: u64,
    pub time_stamp: f64,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameInfoV2Raw {
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    /// Bits per pixel
    pub bpp: u32,
    pub format: u32,
    pub frame_number: u64,
    /// Microseconds
    pub system_time: u64,
    /// Microseconds
    pub capture_time: u64,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionDataV1Raw {
    pub kind: u32,
    pub frame_number: u64,
    /// Milliseconds
    pub time_stamp: f64,
    pub data: [f32; 3],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionDataV2Raw {
    pub kind: u32,
    pub frame_number: u64,
    /// Microseconds
    pub capture_time: u64,
    pub data: [f32; 3],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MetadataEntryRaw {
    pub id: u32,
    pub value: f64,
}
