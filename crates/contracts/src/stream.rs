//! Stream model - identity, pixel layout and calibration of recorded streams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a recorded video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Depth,
    Color,
    Infrared,
    Infrared2,
    Fisheye,
}

impl StreamKind {
    /// All video streams, in on-disk numbering order
    pub const ALL: [StreamKind; 5] = [
        StreamKind::Depth,
        StreamKind::Color,
        StreamKind::Infrared,
        StreamKind::Infrared2,
        StreamKind::Fisheye,
    ];

    /// Decode the on-disk stream id
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// On-disk stream id
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Depth => "depth",
            StreamKind::Color => "color",
            StreamKind::Infrared => "infrared",
            StreamKind::Infrared2 => "infrared2",
            StreamKind::Fisheye => "fisheye",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown stream '{s}'"))
    }
}

/// Pixel format of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Any,
    Z16,
    Disparity16,
    Xyz32f,
    Yuyv,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Y8,
    Y16,
    Raw10,
    Raw16,
    Raw8,
}

impl PixelFormat {
    const TABLE: [PixelFormat; 14] = [
        PixelFormat::Any,
        PixelFormat::Z16,
        PixelFormat::Disparity16,
        PixelFormat::Xyz32f,
        PixelFormat::Yuyv,
        PixelFormat::Rgb8,
        PixelFormat::Bgr8,
        PixelFormat::Rgba8,
        PixelFormat::Bgra8,
        PixelFormat::Y8,
        PixelFormat::Y16,
        PixelFormat::Raw10,
        PixelFormat::Raw16,
        PixelFormat::Raw8,
    ];

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::TABLE.get(raw as usize).copied()
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Canonical bits per pixel
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Any => 0,
            PixelFormat::Y8 | PixelFormat::Raw8 => 8,
            PixelFormat::Raw10 => 10,
            PixelFormat::Z16
            | PixelFormat::Disparity16
            | PixelFormat::Yuyv
            | PixelFormat::Y16
            | PixelFormat::Raw16 => 16,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 24,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 32,
            PixelFormat::Xyz32f => 96,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Compression applied to stored image payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    #[default]
    None,
    Deflate,
}

impl CompressionType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Deflate),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Deflate => 1,
        }
    }
}

/// Lens distortion model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionModel {
    #[default]
    None,
    ModifiedBrownConrady,
    InverseBrownConrady,
    FTheta,
}

impl DistortionModel {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::ModifiedBrownConrady,
            2 => Self::InverseBrownConrady,
            3 => Self::FTheta,
            _ => Self::None,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Pinhole intrinsics of a stream
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub ppx: f32,
    pub ppy: f32,
    pub fx: f32,
    pub fy: f32,
    pub model: DistortionModel,
    pub coeffs: [f32; 5],
}

/// Rigid transform between two streams (column-major rotation, meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        }
    }
}

/// Resolution, rate and format of a stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub stream: StreamKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub intrinsics: Intrinsics,
}

impl StreamProfile {
    /// Bytes per decoded row when no explicit stride is recorded
    pub fn default_stride(&self) -> u32 {
        self.width * self.format.bits_per_pixel() / 8
    }
}

/// Static per-stream metadata read from the recording header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub profile: StreamProfile,
    /// Transform from this stream to the depth stream
    pub extrinsics: Extrinsics,
    pub depth_scale: f32,
    pub compression: CompressionType,
    /// Frame count stored in the header (0 when the recorder did not know it)
    pub nframes: u32,
}
