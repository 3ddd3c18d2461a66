//! # Recording Format
//!
//! Readers and writer for `.rscp` capture recordings.
//!
//! - [`V1Reader`] / [`V2Reader`]: `contracts::FormatReader` per on-disk version
//! - [`open_reader`]: picks the reader from the header's version field
//! - [`RecordingFile`]: the buffered file primitive used by the engine
//! - [`RecordingWriter`] and [`synth`]: produce recordings

mod chunk;
mod conversions;
mod file;
mod headers;
pub mod layout;
mod records;
pub mod synth;
mod v1;
mod v2;
mod writer;

pub use file::RecordingFile;
pub use headers::read_format_version;
pub use v1::V1Reader;
pub use v2::V2Reader;
pub use writer::{FrameWrite, RecordingWriter};

use contracts::{FormatReader, PlaybackError, ReadSeek, Result};

/// Reader for a given format version
pub fn reader_for_version(version: u32) -> Result<Box<dyn FormatReader>> {
    match version {
        layout::FORMAT_V1 => Ok(Box::new(V1Reader)),
        layout::FORMAT_V2 => Ok(Box::new(V2Reader)),
        other => Err(PlaybackError::UnsupportedFormatVersion { version: other }),
    }
}

/// Read the version field of `file` and return the matching reader
pub fn open_reader(file: &mut dyn ReadSeek) -> Result<Box<dyn FormatReader>> {
    let version = read_format_version(file)?;
    reader_for_version(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom, Write};

    use contracts::{
        CameraInfoField, CaptureMode, CompressionType, FrameMetadata, MotionKind, MotionSample,
        PixelFormat, SampleDescriptor, StreamKind,
    };

    use crate::synth::{stream_info, synth_headers, synth_pixels};

    fn depth_color() -> Vec<contracts::StreamInfo> {
        vec![
            stream_info(StreamKind::Depth, 4, 2, 30, PixelFormat::Z16, CompressionType::Deflate),
            stream_info(StreamKind::Color, 2, 2, 30, PixelFormat::Rgb8, CompressionType::None),
        ]
    }

    fn write_fixture(version: u32) -> Cursor<Vec<u8>> {
        let streams = depth_color();
        let headers = synth_headers(version, &streams);
        let mut writer = RecordingWriter::new(Cursor::new(Vec::new()), &headers).unwrap();

        let mut metadata = FrameMetadata::new();
        metadata.insert(7, 12.5);
        let pixels = synth_pixels(&streams[0].profile, 0);
        writer
            .write_frame(
                StreamKind::Depth,
                &FrameWrite {
                    capture_time: 33_333,
                    system_time: 1_000,
                    frame_number: 1,
                    pixels: &pixels,
                    metadata: &metadata,
                },
            )
            .unwrap();
        writer
            .write_motion(&MotionSample {
                kind: MotionKind::Gyro,
                capture_time: 40_000,
                frame_number: 3,
                offset: 0,
                data: [0.1, 0.2, 0.3],
            })
            .unwrap();

        let mut cursor = writer.finish().unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        cursor
    }

    #[test]
    fn test_v2_headers_and_records() {
        let mut file = write_fixture(2);
        let reader = open_reader(&mut file).unwrap();
        assert_eq!(reader.version(), 2);
        assert_eq!(reader.size_of_pitches(), 16);

        let headers = reader.read_headers(&mut file).unwrap();
        assert_eq!(headers.streams.len(), 2);
        assert_eq!(headers.streams[&StreamKind::Depth].nframes, 1);
        assert_eq!(headers.streams[&StreamKind::Color].nframes, 0);
        assert_eq!(headers.sw_info.librealsense.to_string(), "1.12.1.0");
        assert_eq!(
            headers.camera_info.get(&CameraInfoField::DeviceName).map(String::as_str),
            Some("Synthetic Capture Device")
        );

        let Some(SampleDescriptor::Frame(frame)) = reader.read_next_record(&mut file).unwrap()
        else {
            panic!("expected a frame record");
        };
        assert_eq!(frame.stream, StreamKind::Depth);
        assert_eq!(frame.capture_time, 33_333);
        assert_eq!(frame.stride, 8);
        assert_eq!(frame.bpp, 16);

        let Some(SampleDescriptor::Motion(motion)) = reader.read_next_record(&mut file).unwrap()
        else {
            panic!("expected a motion record");
        };
        assert_eq!(motion.kind, MotionKind::Gyro);
        assert_eq!(motion.capture_time, 40_000);
        assert!(reader.read_next_record(&mut file).unwrap().is_none());

        let (metadata, read) = reader.read_frame_metadata(&mut file, &frame).unwrap();
        assert_eq!(metadata.get(&7), Some(&12.5));
        assert_eq!(read, 4 + 12);
    }

    #[test]
    fn test_v1_conversions_on_read() {
        let mut file = write_fixture(1);
        let reader = open_reader(&mut file).unwrap();
        assert_eq!(reader.version(), 1);
        assert_eq!(reader.size_of_pitches(), 0);

        let headers = reader.read_headers(&mut file).unwrap();
        assert_eq!(headers.header.capture_mode, CaptureMode::Synced);
        assert_eq!(
            headers.camera_info.get(&CameraInfoField::SerialNumber).map(String::as_str),
            Some("000000000001")
        );

        let Some(SampleDescriptor::Frame(frame)) = reader.read_next_record(&mut file).unwrap()
        else {
            panic!("expected a frame record");
        };
        // stored as 4 px stride and 2.0 bytes per pixel
        assert_eq!(frame.stride, 8);
        assert_eq!(frame.bpp, 16);
        assert_eq!(frame.capture_time, 33_333);
        assert_eq!(frame.system_time, 1_000);
        assert!(frame.metadata.is_none());

        let (metadata, read) = reader.read_frame_metadata(&mut file, &frame).unwrap();
        assert!(metadata.is_empty());
        assert_eq!(read, 0);
    }

    #[test]
    fn test_unsupported_version() {
        let mut file = write_fixture(2);
        file.get_mut()[4..8].copy_from_slice(&9u32.to_le_bytes());
        let err = open_reader(&mut file).err().unwrap();
        assert!(matches!(
            err,
            PlaybackError::UnsupportedFormatVersion { version: 9 }
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut file = Cursor::new(b"NOPE\x02\0\0\0".to_vec());
        let err = open_reader(&mut file).err().unwrap();
        assert!(matches!(err, PlaybackError::MalformedRecord { .. }));
    }

    #[test]
    fn test_garbage_record_is_malformed() {
        let mut file = write_fixture(2);
        file.seek(SeekFrom::End(0)).unwrap();
        file.write_all(&[0xff; 8]).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let reader = open_reader(&mut file).unwrap();
        reader.read_headers(&mut file).unwrap();
        assert!(reader.read_next_record(&mut file).unwrap().is_some());
        assert!(reader.read_next_record(&mut file).unwrap().is_some());
        let err = reader.read_next_record(&mut file).unwrap_err();
        assert!(matches!(err, PlaybackError::MalformedRecord { .. }));
    }

    #[test]
    fn test_writer_rejects_unknown_stream() {
        let headers = synth_headers(2, &depth_color());
        let mut writer = RecordingWriter::new(Cursor::new(Vec::new()), &headers).unwrap();
        let err = writer
            .write_encoded_frame(
                StreamKind::Fisheye,
                &FrameWrite {
                    capture_time: 0,
                    system_time: 0,
                    frame_number: 0,
                    pixels: &[],
                    metadata: &FrameMetadata::new(),
                },
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, PlaybackError::StreamUnavailable { .. }));
    }
}
