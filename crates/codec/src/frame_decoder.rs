//! Decoder implementation used by the playback worker.

use bytes::Bytes;
use contracts::{CompressionType, Decoder, DecoderError, ImageLayout};
use tracing::trace;

use crate::deflate::decode_deflate;
use crate::raw::decode_raw;

/// Dispatches on the stream's compression type
///
/// Keeps one inflate scratch buffer alive across frames so steady-state
/// decoding of equally sized images does not reallocate.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    scratch: Vec<u8>,
    decoded_frames: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames decoded successfully
    pub fn decoded_frames(&self) -> u64 {
        self.decoded_frames
    }
}

impl Decoder for FrameDecoder {
    fn decode(
        &mut self,
        compression: CompressionType,
        encoded: &[u8],
        layout: ImageLayout,
    ) -> Result<Bytes, DecoderError> {
        let expected = layout.decoded_size();
        let decoded = match compression {
            CompressionType::None => decode_raw(encoded, expected)?,
            CompressionType::Deflate => decode_deflate(encoded, expected, &mut self.scratch)?,
        };

        self.decoded_frames += 1;
        metrics::counter!("codec_frames_decoded_total", "compression" => format!("{compression:?}"))
            .increment(1);
        trace!(
            ?compression,
            encoded = encoded.len(),
            decoded = decoded.len(),
            "frame decoded"
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PixelFormat;

    fn layout() -> ImageLayout {
        ImageLayout {
            format: PixelFormat::Z16,
            width: 4,
            height: 2,
            stride: 8,
        }
    }

    #[test]
    fn test_decoder_dispatch() {
        let raw: Vec<u8> = (0u8..16).collect();
        let mut decoder = FrameDecoder::new();

        let out = decoder.decode(CompressionType::None, &raw, layout()).unwrap();
        assert_eq!(&out[..], &raw[..]);

        let encoded = crate::encode(CompressionType::Deflate, &raw).unwrap();
        let out = decoder
            .decode(CompressionType::Deflate, &encoded, layout())
            .unwrap();
        assert_eq!(&out[..], &raw[..]);
        assert_eq!(decoder.decoded_frames(), 2);
    }

    #[test]
    fn test_decoder_error_message() {
        let mut decoder = FrameDecoder::new();
        let err = decoder
            .decode(CompressionType::None, &[0u8; 3], layout())
            .unwrap_err();
        assert!(err.message.contains("truncated"));
        assert_eq!(decoder.decoded_frames(), 0);
    }
}
