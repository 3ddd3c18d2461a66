//! zlib/deflate payloads

use std::io::{Read, Write};

use bytes::Bytes;
use contracts::CompressionType;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::error::{CodecError, Result};

/// Inflate a zlib stream that must expand to exactly `expected` bytes
pub fn decode_deflate(encoded: &[u8], expected: usize, scratch: &mut Vec<u8>) -> Result<Bytes> {
    scratch.clear();
    scratch.reserve(expected);

    // One byte of slack so oversized streams are detected without inflating them fully
    let mut decoder = ZlibDecoder::new(encoded).take(expected as u64 + 1);
    decoder
        .read_to_end(scratch)
        .map_err(|e| CodecError::Corrupt {
            compression: CompressionType::Deflate,
            message: e.to_string(),
        })?;

    if scratch.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: scratch.len(),
        });
    }
    Ok(Bytes::copy_from_slice(scratch))
}

/// Compress raw pixels into a zlib stream
pub fn encode_deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::fast());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_deflate_random_image() {
        let mut rng = rand::rng();
        let raw: Vec<u8> = (0..640 * 2).map(|_| rng.random::<u8>()).collect();
        let encoded = encode_deflate(&raw).unwrap();

        let mut scratch = Vec::new();
        let decoded = decode_deflate(&encoded, raw.len(), &mut scratch).unwrap();
        assert_eq!(&decoded[..], &raw[..]);
    }

    #[test]
    fn test_deflate_size_mismatch() {
        let encoded = encode_deflate(&[7u8; 100]).unwrap();
        let mut scratch = Vec::new();

        let err = decode_deflate(&encoded, 64, &mut scratch).unwrap_err();
        assert!(matches!(err, CodecError::SizeMismatch { expected: 64, .. }));

        let err = decode_deflate(&encoded, 128, &mut scratch).unwrap_err();
        assert!(matches!(
            err,
            CodecError::SizeMismatch {
                expected: 128,
                actual: 100
            }
        ));
    }

    #[test]
    fn test_deflate_garbage_rejected() {
        let mut scratch = Vec::new();
        let err = decode_deflate(&[0xde, 0xad, 0xbe, 0xef], 16, &mut scratch).unwrap_err();
        assert!(matches!(err, CodecError::Corrupt { .. }));
    }
}
