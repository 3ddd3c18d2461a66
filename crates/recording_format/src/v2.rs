//! Current format reader.

use std::io::SeekFrom;

use contracts::{
    CameraInfo, CameraInfoField, FormatReader, FrameDescriptor, FrameMetadata, MotionSample,
    PlaybackError, ReadSeek, RecordingHeaders, Result, SampleDescriptor,
};
use tracing::trace;

use crate::chunk::{expect_chunk, read_bytes, read_fixed_chunk, skip, BodyReader};
use crate::headers::read_header_region;
use crate::layout::{
    ChunkId, FrameInfoV2Raw, MetadataEntryRaw, MotionDataV2Raw, FORMAT_V2, V2_PITCHES_SIZE,
};
use crate::records::{motion_kind, pixel_format, read_sample_info, skip_image_chunk, RecordKind};

/// Reader for v2 recordings
///
/// Every frame record is `FrameInfo`, `ImageData` (pitches block first) and
/// `FrameMetadata`, possibly with zero entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct V2Reader;

fn parse_device_info(body: &[u8], base: u64) -> Result<CameraInfo> {
    let mut reader = BodyReader::new(body, base);
    let count = reader.u32()?;
    let mut info = CameraInfo::new();
    for _ in 0..count {
        let field = reader.u32()?;
        let value = reader.string()?;
        // Fields newer than this build are ignored
        if let Some(field) = CameraInfoField::from_raw(field) {
            info.insert(field, value);
        }
    }
    Ok(info)
}

impl FormatReader for V2Reader {
    fn version(&self) -> u32 {
        FORMAT_V2
    }

    fn read_headers(&self, file: &mut dyn ReadSeek) -> Result<RecordingHeaders> {
        read_header_region(file, FORMAT_V2, parse_device_info)
    }

    fn read_next_record(&self, file: &mut dyn ReadSeek) -> Result<Option<SampleDescriptor>> {
        let Some((offset, kind)) = read_sample_info(file)? else {
            return Ok(None);
        };

        match kind {
            RecordKind::Frame(stream) => {
                let info: FrameInfoV2Raw = read_fixed_chunk(file, ChunkId::FrameInfo)?;
                let (payload_offset, payload_size) =
                    skip_image_chunk(file, self.size_of_pitches())?;

                let metadata_header = file.stream_position()?;
                let metadata_size = expect_chunk(file, ChunkId::FrameMetadata)?;
                skip(file, metadata_size as u64)?;

                Ok(Some(SampleDescriptor::Frame(FrameDescriptor {
                    stream,
                    capture_time: info.capture_time,
                    system_time: info.system_time,
                    frame_number: info.frame_number,
                    width: info.width,
                    height: info.height,
                    stride: info.stride,
                    bpp: info.bpp,
                    format: pixel_format(info.format, offset)?,
                    offset: payload_offset,
                    payload_size,
                    metadata: Some((metadata_header + 8, metadata_size)),
                })))
            }
            RecordKind::Motion => {
                let data: MotionDataV2Raw = read_fixed_chunk(file, ChunkId::MotionData)?;
                Ok(Some(SampleDescriptor::Motion(MotionSample {
                    kind: motion_kind(data.kind, offset)?,
                    capture_time: data.capture_time,
                    frame_number: data.frame_number,
                    offset,
                    data: data.data,
                })))
            }
        }
    }

    fn read_frame_metadata(
        &self,
        file: &mut dyn ReadSeek,
        frame: &FrameDescriptor,
    ) -> Result<(FrameMetadata, usize)> {
        let Some((offset, size)) = frame.metadata else {
            return Ok((FrameMetadata::new(), 0));
        };

        file.seek(SeekFrom::Start(offset))?;
        let body = read_bytes(file, size as usize, "frame metadata")?;
        let mut reader = BodyReader::new(&body, offset);
        let count = reader.u32()?;
        if reader.remaining() != count as usize * std::mem::size_of::<MetadataEntryRaw>() {
            return Err(PlaybackError::malformed(
                offset,
                format!("frame metadata announces {count} entries in {size} bytes"),
            ));
        }

        let mut metadata = FrameMetadata::new();
        for _ in 0..count {
            let entry: MetadataEntryRaw = reader.pod()?;
            metadata.insert(entry.id, entry.value);
        }
        trace!(entries = metadata.len(), "frame metadata read");
        Ok((metadata, body.len()))
    }

    fn size_of_pitches(&self) -> usize {
        V2_PITCHES_SIZE
    }
}
