//! Legacy format reader.

use contracts::{
    CameraInfo, CaptureMode, FormatReader, FrameDescriptor, FrameMetadata, MotionSample,
    ReadSeek, RecordingHeaders, Result, SampleDescriptor,
};

use crate::chunk::{read_fixed_chunk, BodyReader};
use crate::conversions::{bpp_bits, camera_info, ms_to_us, stride_bytes};
use crate::headers::read_header_region;
use crate::layout::{ChunkId, DeviceInfoV1Raw, FrameInfoV1Raw, MotionDataV1Raw, FORMAT_V1};
use crate::records::{motion_kind, pixel_format, read_sample_info, skip_image_chunk, RecordKind};

/// Reader for v1 recordings
///
/// v1 has no pitches block, no per-frame metadata and no capture mode; stride,
/// bpp and timestamps are converted to canonical units on read.
#[derive(Debug, Default, Clone, Copy)]
pub struct V1Reader;

fn parse_device_info(body: &[u8], base: u64) -> Result<CameraInfo> {
    let raw: DeviceInfoV1Raw = BodyReader::new(body, base).pod()?;
    Ok(camera_info(&raw))
}

impl FormatReader for V1Reader {
    fn version(&self) -> u32 {
        FORMAT_V1
    }

    fn read_headers(&self, file: &mut dyn ReadSeek) -> Result<RecordingHeaders> {
        let mut headers = read_header_region(file, FORMAT_V1, parse_device_info)?;
        headers.header.capture_mode = CaptureMode::Synced;
        Ok(headers)
    }

    fn read_next_record(&self, file: &mut dyn ReadSeek) -> Result<Option<SampleDescriptor>> {
        let Some((offset, kind)) = read_sample_info(file)? else {
            return Ok(None);
        };

        match kind {
            RecordKind::Frame(stream) => {
                let info: FrameInfoV1Raw = read_fixed_chunk(file, ChunkId::FrameInfo)?;
                let (payload_offset, payload_size) = skip_image_chunk(file, self.size_of_pitches())?;

                let (bpp, stride_x) = (info.bpp, info.stride_x);
                Ok(Some(SampleDescriptor::Frame(FrameDescriptor {
                    stream,
                    capture_time: ms_to_us(info.time_stamp),
                    system_time: info.system_time.saturating_mul(1000),
                    frame_number: info.frame_number,
                    width: info.width,
                    height: info.height,
                    stride: stride_bytes(stride_x, bpp),
                    bpp: bpp_bits(bpp),
                    format: pixel_format(info.format, offset)?,
                    offset: payload_offset,
                    payload_size,
                    metadata: None,
                })))
            }
            RecordKind::Motion => {
                let data: MotionDataV1Raw = read_fixed_chunk(file, ChunkId::MotionData)?;
                Ok(Some(SampleDescriptor::Motion(MotionSample {
                    kind: motion_kind(data.kind, offset)?,
                    capture_time: ms_to_us(data.time_stamp),
                    frame_number: data.frame_number,
                    offset,
                    data: data.data,
                })))
            }
        }
    }

    fn read_frame_metadata(
        &self,
        _file: &mut dyn ReadSeek,
        _frame: &FrameDescriptor,
    ) -> Result<(FrameMetadata, usize)> {
        Ok((FrameMetadata::new(), 0))
    }

    fn size_of_pitches(&self) -> usize {
        0
    }
}
