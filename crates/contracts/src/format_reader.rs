//! FormatReader trait - per-version parsing of recording files
//!
//! The engine holds one `Box<dyn FormatReader>` chosen from the version field of
//! the file header. Readers are stateless: every call receives the file handle
//! positioned where the previous call left it.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};

use crate::{
    CameraInfo, Capability, FileHeader, FrameDescriptor, FrameMetadata, MotionIntrinsics,
    Properties, Result, SampleDescriptor, StreamInfo, StreamKind, SwInfo,
};

/// Seekable byte source handed to readers
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Everything parsed from the header region, in canonical units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingHeaders {
    pub header: FileHeader,
    pub sw_info: SwInfo,
    pub streams: BTreeMap<StreamKind, StreamInfo>,
    pub camera_info: CameraInfo,
    pub capabilities: Vec<Capability>,
    pub properties: Properties,
    pub motion_intrinsics: MotionIntrinsics,
}

/// Parser for one on-disk format version
pub trait FormatReader: Send + Sync {
    /// Format version handled by this reader
    fn version(&self) -> u32;

    /// Parse the header region and leave `file` at the first sample record
    fn read_headers(&self, file: &mut dyn ReadSeek) -> Result<RecordingHeaders>;

    /// Parse the sample record at the current position
    ///
    /// Returns `Ok(None)` at a clean end of file. The file is left at the next
    /// record. Payloads are skipped, only their offsets are recorded.
    fn read_next_record(&self, file: &mut dyn ReadSeek) -> Result<Option<SampleDescriptor>>;

    /// Read the metadata block of `frame`, returning the values and bytes read
    fn read_frame_metadata(
        &self,
        file: &mut dyn ReadSeek,
        frame: &FrameDescriptor,
    ) -> Result<(FrameMetadata, usize)>;

    /// Size of the pitches block stored ahead of every image payload
    fn size_of_pitches(&self) -> usize;
}
