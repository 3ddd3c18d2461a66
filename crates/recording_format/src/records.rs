//! Sample record pieces common to all versions.

use contracts::{MotionKind, PixelFormat, PlaybackError, ReadSeek, Result, StreamKind};

use crate::chunk::{expect_chunk, read_pod, skip, try_read_chunk_header};
use crate::layout::{
    ChunkId, SampleInfoRaw, MOTION_KIND_ACCEL, MOTION_KIND_GYRO, SAMPLE_KIND_FRAME,
    SAMPLE_KIND_MOTION,
};

/// Kind of record announced by a sample info chunk
pub(crate) enum RecordKind {
    Frame(StreamKind),
    Motion,
}

/// Read the sample info chunk opening the next record, `None` at end of file
pub(crate) fn read_sample_info(file: &mut dyn ReadSeek) -> Result<Option<(u64, RecordKind)>> {
    let offset = file.stream_position()?;
    let Some((id, size)) = try_read_chunk_header(file)? else {
        return Ok(None);
    };
    if id != ChunkId::SampleInfo || size as usize != std::mem::size_of::<SampleInfoRaw>() {
        return Err(PlaybackError::malformed(
            offset,
            format!("expected SampleInfo chunk, found {id:?} ({size} bytes)"),
        ));
    }
    let info: SampleInfoRaw = read_pod(file, "sample info")?;
    let (kind, channel) = (info.kind, info.channel);
    let record = match kind {
        SAMPLE_KIND_FRAME => RecordKind::Frame(stream_kind(channel, offset)?),
        SAMPLE_KIND_MOTION => RecordKind::Motion,
        other => {
            return Err(PlaybackError::malformed(
                offset,
                format!("unknown sample kind {other}"),
            ))
        }
    };
    Ok(Some((offset, record)))
}

/// Record the image chunk body position and skip over it
pub(crate) fn skip_image_chunk(file: &mut dyn ReadSeek, pitches: usize) -> Result<(u64, u32)> {
    let header_offset = file.stream_position()?;
    let size = expect_chunk(file, ChunkId::ImageData)?;
    if (size as usize) < pitches {
        return Err(PlaybackError::malformed(
            header_offset,
            format!("image chunk of {size} bytes cannot hold {pitches} byte pitches"),
        ));
    }
    let body_offset = header_offset + 8;
    skip(file, size as u64)?;
    Ok((body_offset, size))
}

pub(crate) fn stream_kind(raw: u32, offset: u64) -> Result<StreamKind> {
    StreamKind::from_raw(raw)
        .ok_or_else(|| PlaybackError::malformed(offset, format!("unknown stream id {raw}")))
}

pub(crate) fn pixel_format(raw: u32, offset: u64) -> Result<PixelFormat> {
    PixelFormat::from_raw(raw)
        .ok_or_else(|| PlaybackError::malformed(offset, format!("unknown pixel format {raw}")))
}

pub(crate) fn motion_kind(raw: u32, offset: u64) -> Result<MotionKind> {
    match raw {
        MOTION_KIND_ACCEL => Ok(MotionKind::Accel),
        MOTION_KIND_GYRO => Ok(MotionKind::Gyro),
        other => Err(PlaybackError::malformed(
            offset,
            format!("unknown motion kind {other}"),
        )),
    }
}

pub(crate) fn motion_kind_raw(kind: MotionKind) -> u32 {
    match kind {
        MotionKind::Accel => MOTION_KIND_ACCEL,
        MotionKind::Gyro => MOTION_KIND_GYRO,
    }
}
