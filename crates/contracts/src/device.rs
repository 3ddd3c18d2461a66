//! Device and recording-level metadata parsed once from the file header.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{Matrix3x4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Property key holding the aggregate dropped-frame count of a session
pub const TOTAL_FRAME_DROPS_PROPERTY: &str = "total_frame_drops";

/// Axis convention used by the recording device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    #[default]
    RearDefault,
    RearOpenCv,
    FrontDefault,
}

impl CoordinateSystem {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::RearDefault),
            1 => Some(Self::RearOpenCv),
            2 => Some(Self::FrontDefault),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

/// How streams were captured relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Frames of all streams were grabbed together
    #[default]
    Synced,
    /// Each stream delivered independently
    Asynced,
}

impl CaptureMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Synced),
            1 => Some(Self::Asynced),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Four-part version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// Versions of the software that produced the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwInfo {
    pub sdk: Version,
    pub librealsense: Version,
}

/// Fixed header at the start of every recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub version: u32,
    pub coordinate_system: CoordinateSystem,
    pub capture_mode: CaptureMode,
    /// Offset of the first sample record
    pub first_frame_offset: u64,
    pub nstreams: u32,
}

/// Summary returned by `query_file_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub version: u32,
    pub capture_mode: CaptureMode,
    pub sdk_version: String,
    pub librealsense_version: String,
}

/// Camera description fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraInfoField {
    DeviceName,
    SerialNumber,
    FirmwareVersion,
    UsbPort,
    ProductId,
}

impl CameraInfoField {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::DeviceName),
            1 => Some(Self::SerialNumber),
            2 => Some(Self::FirmwareVersion),
            3 => Some(Self::UsbPort),
            4 => Some(Self::ProductId),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

pub type CameraInfo = BTreeMap<CameraInfoField, String>;

/// Numeric device options captured with the session
pub type Properties = BTreeMap<String, f64>;

/// Features the recording device advertised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Depth,
    Color,
    Infrared,
    Infrared2,
    Fisheye,
    MotionEvents,
    MotionModuleFwUpdate,
    AdapterBoard,
    Enumeration,
}

impl Capability {
    const TABLE: [Capability; 9] = [
        Capability::Depth,
        Capability::Color,
        Capability::Infrared,
        Capability::Infrared2,
        Capability::Fisheye,
        Capability::MotionEvents,
        Capability::MotionModuleFwUpdate,
        Capability::AdapterBoard,
        Capability::Enumeration,
    ];

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::TABLE.get(raw as usize).copied()
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Calibration of one motion sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionDeviceIntrinsics {
    /// Scale and bias, row-major 3x4
    pub data: [[f32; 4]; 3],
    pub noise_variances: [f32; 3],
    pub bias_variances: [f32; 3],
}

impl MotionDeviceIntrinsics {
    pub fn identity() -> Self {
        Self {
            data: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            noise_variances: [0.0; 3],
            bias_variances: [0.0; 3],
        }
    }

    /// Apply the affine calibration to a raw reading
    pub fn apply(&self, raw: [f32; 3]) -> [f32; 3] {
        let m = Matrix3x4::from_fn(|r, c| self.data[r][c]);
        let v: Vector3<f32> = m * Vector4::new(raw[0], raw[1], raw[2], 1.0);
        [v.x, v.y, v.z]
    }
}

/// Accelerometer and gyroscope calibration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionIntrinsics {
    pub acc: MotionDeviceIntrinsics,
    pub gyro: MotionDeviceIntrinsics,
}
