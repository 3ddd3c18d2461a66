//! Random-access payload reads and image decoding.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    CompressionType, Decoder, FormatReader, FrameDescriptor, FrameSample, ImageLayout,
    PlaybackError, Result, Sample, SampleDescriptor, StreamInfo, StreamKind,
};
use recording_format::RecordingFile;
use tracing::trace;

/// Second file handle plus the decoder; owned by whoever materializes samples
pub(crate) struct PayloadReader {
    file: RecordingFile,
    reader: Arc<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    compression: BTreeMap<StreamKind, CompressionType>,
}

impl PayloadReader {
    pub(crate) fn new(
        file: RecordingFile,
        reader: Arc<dyn FormatReader>,
        decoder: Box<dyn Decoder>,
        streams: &BTreeMap<StreamKind, StreamInfo>,
    ) -> Self {
        Self {
            file,
            reader,
            decoder,
            compression: streams
                .iter()
                .map(|(kind, info)| (*kind, info.compression))
                .collect(),
        }
    }

    /// Read the payload of an indexed sample and turn it into a deliverable one
    pub(crate) fn materialize(
        &mut self,
        descriptor: &SampleDescriptor,
        local: u32,
    ) -> Result<Sample> {
        match descriptor {
            SampleDescriptor::Motion(motion) => Ok(Sample::Motion(motion.clone())),
            SampleDescriptor::Frame(frame) => self.read_frame(frame, local).map(Sample::Frame),
        }
    }

    /// Decoded image plus metadata of `frame`
    pub(crate) fn read_frame(
        &mut self,
        frame: &FrameDescriptor,
        local: u32,
    ) -> Result<FrameSample> {
        let data = self.read_image_buffer(frame)?;
        let (metadata, _) = self.reader.read_frame_metadata(&mut self.file, frame)?;
        Ok(FrameSample::from_descriptor(local, frame, data, metadata))
    }

    /// Read the encoded payload, skip the pitches block and decode
    pub(crate) fn read_image_buffer(&mut self, frame: &FrameDescriptor) -> Result<Bytes> {
        let pitches = self.reader.size_of_pitches();
        let Some(encoded_len) = (frame.payload_size as usize).checked_sub(pitches) else {
            return Err(PlaybackError::decode(
                frame.stream,
                frame.offset,
                format!(
                    "payload of {} bytes is smaller than the pitches block",
                    frame.payload_size
                ),
            ));
        };

        let encoded = self.file.read_at(frame.offset + pitches as u64, encoded_len)?;
        let compression = self
            .compression
            .get(&frame.stream)
            .copied()
            .unwrap_or_default();
        let layout = ImageLayout {
            format: frame.format,
            width: frame.width,
            height: frame.height,
            stride: frame.stride,
        };

        let data = self
            .decoder
            .decode(compression, &encoded, layout)
            .map_err(|e| PlaybackError::decode(frame.stream, frame.offset, e.message))?;
        if data.len() != frame.decoded_size() {
            return Err(PlaybackError::decode(
                frame.stream,
                frame.offset,
                format!(
                    "decoder produced {} bytes, expected {}",
                    data.len(),
                    frame.decoded_size()
                ),
            ));
        }

        trace!(
            stream = %frame.stream,
            offset = frame.offset,
            encoded = encoded_len,
            "image decoded"
        );
        Ok(data)
    }
}
