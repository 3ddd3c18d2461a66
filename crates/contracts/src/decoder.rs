//! Decoder trait - image payload decompression

use bytes::Bytes;
use thiserror::Error;

use crate::{CompressionType, PixelFormat};

/// Decoder rejection; the engine attaches stream and offset
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DecoderError {
    pub message: String,
}

impl DecoderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Geometry of the image being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row of the decoded image
    pub stride: u32,
}

impl ImageLayout {
    pub fn decoded_size(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

/// Turns an encoded payload into raw pixels
///
/// Implementations may keep scratch state between frames, hence `&mut self`.
/// The output must be exactly `layout.decoded_size()` bytes.
pub trait Decoder: Send {
    fn decode(
        &mut self,
        compression: CompressionType,
        encoded: &[u8],
        layout: ImageLayout,
    ) -> Result<Bytes, DecoderError>;
}
