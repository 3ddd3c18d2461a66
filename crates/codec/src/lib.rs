//! # Codec
//!
//! Image payload codecs for recorded captures.
//!
//! - [`FrameDecoder`]: the `contracts::Decoder` used by the playback engine
//! - [`encode`]: the matching encoder used when writing recordings

mod deflate;
mod error;
mod frame_decoder;
mod raw;

pub use error::{CodecError, Result};
pub use frame_decoder::FrameDecoder;

use contracts::CompressionType;

/// Encode raw pixels with the given compression
pub fn encode(compression: CompressionType, raw: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(raw.to_vec()),
        CompressionType::Deflate => deflate::encode_deflate(raw),
    }
}
