//! Recording writer, used to produce fixtures and synthetic captures.
//!
//! Writes a placeholder header, the header chunks, then sample records as they
//! arrive. `finish` patches per-stream frame counts back into the header.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use bytemuck::Zeroable;
use contracts::{
    CameraInfoField, FrameMetadata, MotionSample, PlaybackError, RecordingHeaders, Result,
    StreamInfo, StreamKind,
};
use tracing::debug;

use crate::conversions::{fill_fixed, us_to_ms};
use crate::layout::{
    ChunkHeader, ChunkId, DeviceInfoV1Raw, FileHeaderRaw, FrameInfoV1Raw, FrameInfoV2Raw,
    MetadataEntryRaw, MotionDataV1Raw, MotionDataV2Raw, MotionDeviceIntrinsicsRaw,
    MotionIntrinsicsRaw, SampleInfoRaw, StreamInfoRaw, SwInfoRaw, FORMAT_V1, FORMAT_V2, MAGIC,
    SAMPLE_KIND_FRAME, SAMPLE_KIND_MOTION, V2_PITCHES_SIZE,
};
use crate::records::motion_kind_raw;

/// One frame to append
#[derive(Debug, Clone, Copy)]
pub struct FrameWrite<'a> {
    pub capture_time: u64,
    pub system_time: u64,
    pub frame_number: u64,
    /// Raw pixels, `stride * height` bytes
    pub pixels: &'a [u8],
    pub metadata: &'a FrameMetadata,
}

/// Writer for `.rscp` recordings
pub struct RecordingWriter<W: Write + Seek> {
    writer: W,
    version: u32,
    streams: BTreeMap<StreamKind, StreamInfo>,
    frame_counts: BTreeMap<StreamKind, u32>,
    stream_chunk_offset: u64,
}

impl RecordingWriter<BufWriter<File>> {
    /// Create a recording file at `path`
    pub fn create(path: &Path, headers: &RecordingHeaders) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), headers)
    }
}

impl<W: Write + Seek> RecordingWriter<W> {
    /// Write the header region for `headers.header.version`
    pub fn new(mut writer: W, headers: &RecordingHeaders) -> Result<Self> {
        let version = headers.header.version;
        if version != FORMAT_V1 && version != FORMAT_V2 {
            return Err(PlaybackError::UnsupportedFormatVersion { version });
        }

        // Placeholder header, patched once the header chunks are written
        writer.write_all(bytemuck::bytes_of(&FileHeaderRaw::zeroed()))?;

        let mut this = Self {
            writer,
            version,
            streams: headers.streams.clone(),
            frame_counts: BTreeMap::new(),
            stream_chunk_offset: 0,
        };

        this.write_device_info(headers)?;

        let sw = &headers.sw_info;
        let sw_raw = SwInfoRaw {
            sdk: [sw.sdk.major, sw.sdk.minor, sw.sdk.patch, sw.sdk.build],
            librealsense: [
                sw.librealsense.major,
                sw.librealsense.minor,
                sw.librealsense.patch,
                sw.librealsense.build,
            ],
        };
        this.write_chunk(ChunkId::SwInfo, bytemuck::bytes_of(&sw_raw))?;

        this.stream_chunk_offset = this.writer.stream_position()?;
        let stream_body = this.stream_info_body();
        this.write_chunk(ChunkId::StreamInfo, &stream_body)?;

        let mut props = Vec::new();
        props.extend_from_slice(&(headers.properties.len() as u32).to_le_bytes());
        for (key, value) in &headers.properties {
            props.extend_from_slice(&(key.len() as u32).to_le_bytes());
            props.extend_from_slice(key.as_bytes());
            props.extend_from_slice(&value.to_le_bytes());
        }
        this.write_chunk(ChunkId::Properties, &props)?;

        let mut caps = Vec::new();
        caps.extend_from_slice(&(headers.capabilities.len() as u32).to_le_bytes());
        for cap in &headers.capabilities {
            caps.extend_from_slice(&cap.to_raw().to_le_bytes());
        }
        this.write_chunk(ChunkId::Capabilities, &caps)?;

        let mi = &headers.motion_intrinsics;
        let mi_raw = MotionIntrinsicsRaw {
            acc: motion_device_raw(&mi.acc),
            gyro: motion_device_raw(&mi.gyro),
        };
        this.write_chunk(ChunkId::MotionIntrinsics, bytemuck::bytes_of(&mi_raw))?;

        let first_frame_offset = this.writer.stream_position()?;
        let header = FileHeaderRaw {
            magic: MAGIC,
            version,
            coordinate_system: headers.header.coordinate_system.to_raw(),
            capture_mode: headers.header.capture_mode.to_raw(),
            first_frame_offset,
            nstreams: this.streams.len() as u32,
        };
        this.writer.seek(SeekFrom::Start(0))?;
        this.writer.write_all(bytemuck::bytes_of(&header))?;
        this.writer.seek(SeekFrom::Start(first_frame_offset))?;

        debug!(version, first_frame_offset, "Recording header written");
        Ok(this)
    }

    /// Encode `frame.pixels` with the stream's compression and append it
    pub fn write_frame(&mut self, stream: StreamKind, frame: &FrameWrite<'_>) -> Result<()> {
        let info = self.stream_info(stream)?;
        let expected = info.profile.default_stride() as usize * info.profile.height as usize;
        if frame.pixels.len() != expected {
            return Err(PlaybackError::Other(format!(
                "{stream} frame has {} bytes, expected {expected}",
                frame.pixels.len()
            )));
        }
        let encoded = codec::encode(info.compression, frame.pixels)
            .map_err(|e| PlaybackError::Other(e.to_string()))?;
        self.write_encoded_frame(stream, frame, &encoded)
    }

    /// Append a frame whose payload is already encoded (or deliberately corrupt)
    pub fn write_encoded_frame(
        &mut self,
        stream: StreamKind,
        frame: &FrameWrite<'_>,
        encoded: &[u8],
    ) -> Result<()> {
        let profile = self.stream_info(stream)?.profile;
        let stride = profile.default_stride();
        let bits = profile.format.bits_per_pixel();

        self.write_chunk(
            ChunkId::SampleInfo,
            bytemuck::bytes_of(&SampleInfoRaw {
                kind: SAMPLE_KIND_FRAME,
                channel: stream.to_raw(),
            }),
        )?;

        if self.version == FORMAT_V1 {
            let info = FrameInfoV1Raw {
                width: profile.width,
                height: profile.height,
                stride_x: profile.width,
                bpp: bits as f32 / 8.0,
                format: profile.format.to_raw(),
                frame_number: frame.frame_number,
                system_time: frame.system_time / 1000,
                time_stamp: us_to_ms(frame.capture_time),
            };
            self.write_chunk(ChunkId::FrameInfo, bytemuck::bytes_of(&info))?;
            self.write_chunk(ChunkId::ImageData, encoded)?;
        } else {
            let info = FrameInfoV2Raw {
                width: profile.width,
                height: profile.height,
                stride,
                bpp: bits,
                format: profile.format.to_raw(),
                frame_number: frame.frame_number,
                system_time: frame.system_time,
                capture_time: frame.capture_time,
            };
            self.write_chunk(ChunkId::FrameInfo, bytemuck::bytes_of(&info))?;

            let mut body = Vec::with_capacity(V2_PITCHES_SIZE + encoded.len());
            body.extend_from_slice(&stride.to_le_bytes());
            body.resize(V2_PITCHES_SIZE, 0);
            body.extend_from_slice(encoded);
            self.write_chunk(ChunkId::ImageData, &body)?;

            let mut meta = Vec::new();
            meta.extend_from_slice(&(frame.metadata.len() as u32).to_le_bytes());
            for (&id, &value) in frame.metadata {
                meta.extend_from_slice(bytemuck::bytes_of(&MetadataEntryRaw { id, value }));
            }
            self.write_chunk(ChunkId::FrameMetadata, &meta)?;
        }

        *self.frame_counts.entry(stream).or_insert(0) += 1;
        Ok(())
    }

    /// Append a motion sample (its `offset` is ignored)
    pub fn write_motion(&mut self, motion: &MotionSample) -> Result<()> {
        self.write_chunk(
            ChunkId::SampleInfo,
            bytemuck::bytes_of(&SampleInfoRaw {
                kind: SAMPLE_KIND_MOTION,
                channel: motion_kind_raw(motion.kind),
            }),
        )?;

        let kind = motion_kind_raw(motion.kind);
        if self.version == FORMAT_V1 {
            let raw = MotionDataV1Raw {
                kind,
                frame_number: motion.frame_number,
                time_stamp: us_to_ms(motion.capture_time),
                data: motion.data,
            };
            self.write_chunk(ChunkId::MotionData, bytemuck::bytes_of(&raw))
        } else {
            let raw = MotionDataV2Raw {
                kind,
                frame_number: motion.frame_number,
                capture_time: motion.capture_time,
                data: motion.data,
            };
            self.write_chunk(ChunkId::MotionData, bytemuck::bytes_of(&raw))
        }
    }

    /// Patch frame counts into the stream info chunk and flush
    pub fn finish(mut self) -> Result<W> {
        for (stream, count) in &self.frame_counts {
            if let Some(info) = self.streams.get_mut(stream) {
                info.nframes = *count;
            }
        }
        let end = self.writer.stream_position()?;
        let body = self.stream_info_body();
        self.writer
            .seek(SeekFrom::Start(self.stream_chunk_offset + 8))?;
        self.writer.write_all(&body)?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        debug!(frames = ?self.frame_counts, bytes = end, "Recording finished");
        Ok(self.writer)
    }

    fn stream_info(&self, stream: StreamKind) -> Result<&StreamInfo> {
        self.streams
            .get(&stream)
            .ok_or(PlaybackError::StreamUnavailable { stream })
    }

    fn write_chunk(&mut self, id: ChunkId, body: &[u8]) -> Result<()> {
        let header = ChunkHeader {
            id: id as u32,
            size: body.len() as u32,
        };
        self.writer.write_all(bytemuck::bytes_of(&header))?;
        self.writer.write_all(body)?;
        Ok(())
    }

    fn write_device_info(&mut self, headers: &RecordingHeaders) -> Result<()> {
        let info = &headers.camera_info;
        if self.version == FORMAT_V1 {
            let mut raw = DeviceInfoV1Raw::zeroed();
            let (mut name, mut serial, mut firmware) = (raw.name, raw.serial, raw.firmware);
            let get = |field: CameraInfoField| info.get(&field).map(String::as_str).unwrap_or("");
            fill_fixed(&mut name, get(CameraInfoField::DeviceName));
            fill_fixed(&mut serial, get(CameraInfoField::SerialNumber));
            fill_fixed(&mut firmware, get(CameraInfoField::FirmwareVersion));
            raw.name = name;
            raw.serial = serial;
            raw.firmware = firmware;
            self.write_chunk(ChunkId::DeviceInfo, bytemuck::bytes_of(&raw))
        } else {
            let mut body = Vec::new();
            body.extend_from_slice(&(info.len() as u32).to_le_bytes());
            for (field, value) in info {
                body.extend_from_slice(&field.to_raw().to_le_bytes());
                body.extend_from_slice(&(value.len() as u32).to_le_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            self.write_chunk(ChunkId::DeviceInfo, &body)
        }
    }

    fn stream_info_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for info in self.streams.values() {
            let p = &info.profile;
            let raw = StreamInfoRaw {
                stream: p.stream.to_raw(),
                width: p.width,
                height: p.height,
                fps: p.fps,
                format: p.format.to_raw(),
                ppx: p.intrinsics.ppx,
                ppy: p.intrinsics.ppy,
                fx: p.intrinsics.fx,
                fy: p.intrinsics.fy,
                model: p.intrinsics.model.to_raw(),
                coeffs: p.intrinsics.coeffs,
                rotation: info.extrinsics.rotation,
                translation: info.extrinsics.translation,
                depth_scale: info.depth_scale,
                compression: info.compression.to_raw(),
                nframes: info.nframes,
            };
            body.extend_from_slice(bytemuck::bytes_of(&raw));
        }
        body
    }
}

fn motion_device_raw(mi: &contracts::MotionDeviceIntrinsics) -> MotionDeviceIntrinsicsRaw {
    let mut data = [0f32; 12];
    for (r, row) in mi.data.iter().enumerate() {
        data[r * 4..r * 4 + 4].copy_from_slice(row);
    }
    MotionDeviceIntrinsicsRaw {
        data,
        noise_variances: mi.noise_variances,
        bias_variances: mi.bias_variances,
    }
}
