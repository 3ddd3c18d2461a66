//! Uncompressed payloads

use bytes::Bytes;

use crate::error::{CodecError, Result};

/// Copy the first `expected` bytes of an uncompressed payload
///
/// Trailing bytes (row alignment padding written by some recorders) are ignored.
pub fn decode_raw(encoded: &[u8], expected: usize) -> Result<Bytes> {
    if encoded.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            actual: encoded.len(),
        });
    }
    Ok(Bytes::copy_from_slice(&encoded[..expected]))
}
