//! Sample descriptors (indexed, payload on disk) and materialized samples (delivered).
//!
//! ## Time Model
//! - `capture_time` is the device timestamp in microseconds and drives pacing
//! - `system_time` is the host clock at capture (microseconds), diagnostics only

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{PixelFormat, StreamKind};

/// Per-frame metadata values keyed by attribute id
pub type FrameMetadata = BTreeMap<u32, f64>;

/// Index channel of a sample: a video stream or the motion channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Stream(StreamKind),
    Motion,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stream(kind) => write!(f, "{kind}"),
            Channel::Motion => f.write_str("motion"),
        }
    }
}

/// Location and layout of one recorded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub stream: StreamKind,
    pub capture_time: u64,
    pub system_time: u64,
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per decoded row
    pub stride: u32,
    pub bpp: u32,
    pub format: PixelFormat,
    /// Offset of the image chunk body (pitches block first)
    pub offset: u64,
    /// Image chunk body size, pitches block included
    pub payload_size: u32,
    /// Offset and size of the frame metadata chunk body, if recorded
    pub metadata: Option<(u64, u32)>,
}

impl FrameDescriptor {
    /// Size of the decoded image
    pub fn decoded_size(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

/// Motion sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Accel,
    Gyro,
}

/// One motion reading; the payload is small and lives in the record header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub kind: MotionKind,
    pub capture_time: u64,
    pub frame_number: u64,
    pub offset: u64,
    pub data: [f32; 3],
}

/// Indexed sample; immutable once appended to the sample index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleDescriptor {
    Frame(FrameDescriptor),
    Motion(MotionSample),
}

impl SampleDescriptor {
    pub fn capture_time(&self) -> u64 {
        match self {
            SampleDescriptor::Frame(f) => f.capture_time,
            SampleDescriptor::Motion(m) => m.capture_time,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            SampleDescriptor::Frame(f) => f.offset,
            SampleDescriptor::Motion(m) => m.offset,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            SampleDescriptor::Frame(f) => Channel::Stream(f.stream),
            SampleDescriptor::Motion(_) => Channel::Motion,
        }
    }
}

/// Decoded frame ready for the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Position of the frame within its stream
    pub index: u32,
    pub stream: StreamKind,
    pub capture_time: u64,
    pub system_time: u64,
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub bpp: u32,
    pub format: PixelFormat,
    pub metadata: FrameMetadata,
    /// Decoded pixels, `stride * height` bytes
    pub data: Bytes,
}

impl FrameSample {
    pub fn from_descriptor(
        index: u32,
        desc: &FrameDescriptor,
        data: Bytes,
        metadata: FrameMetadata,
    ) -> Self {
        Self {
            index,
            stream: desc.stream,
            capture_time: desc.capture_time,
            system_time: desc.system_time,
            frame_number: desc.frame_number,
            width: desc.width,
            height: desc.height,
            stride: desc.stride,
            bpp: desc.bpp,
            format: desc.format,
            metadata,
            data,
        }
    }
}

/// Unit delivered to the sample callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sample {
    Frame(FrameSample),
    Motion(MotionSample),
}

impl Sample {
    pub fn capture_time(&self) -> u64 {
        match self {
            Sample::Frame(f) => f.capture_time,
            Sample::Motion(m) => m.capture_time,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Sample::Frame(f) => Channel::Stream(f.stream),
            Sample::Motion(_) => Channel::Motion,
        }
    }
}
