//! Chunk-level read helpers shared by the version readers.

use std::io::{self, SeekFrom};
use std::mem::size_of;

use bytemuck::Pod;
use contracts::{PlaybackError, ReadSeek, Result};

use crate::layout::{ChunkHeader, ChunkId};

fn to_malformed(offset: u64, what: &str, err: io::Error) -> PlaybackError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => PlaybackError::malformed(offset, format!("truncated {what}")),
        _ => PlaybackError::Io(err),
    }
}

/// Read one POD value at the current position
pub fn read_pod<T: Pod>(file: &mut dyn ReadSeek, what: &str) -> Result<T> {
    let offset = file.stream_position()?;
    let mut buf = vec![0u8; size_of::<T>()];
    file.read_exact(&mut buf)
        .map_err(|e| to_malformed(offset, what, e))?;
    Ok(bytemuck::pod_read_unaligned(&buf))
}

/// Read `len` raw bytes at the current position
pub fn read_bytes(file: &mut dyn ReadSeek, len: usize, what: &str) -> Result<Vec<u8>> {
    let offset = file.stream_position()?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)
        .map_err(|e| to_malformed(offset, what, e))?;
    Ok(buf)
}

/// Read a chunk header, or `None` when the file ends exactly here
pub fn try_read_chunk_header(file: &mut dyn ReadSeek) -> Result<Option<(ChunkId, u32)>> {
    let offset = file.stream_position()?;
    let mut buf = [0u8; size_of::<ChunkHeader>()];
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < buf.len() {
        return Err(PlaybackError::malformed(offset, "truncated chunk header"));
    }

    let header: ChunkHeader = bytemuck::pod_read_unaligned(&buf);
    let (id, size) = (header.id, header.size);
    let id = ChunkId::from_raw(id)
        .ok_or_else(|| PlaybackError::malformed(offset, format!("unknown chunk id {id}")))?;
    Ok(Some((id, size)))
}

/// Read a chunk header that must be present and of the given id
pub fn expect_chunk(file: &mut dyn ReadSeek, expected: ChunkId) -> Result<u32> {
    let offset = file.stream_position()?;
    match try_read_chunk_header(file)? {
        Some((id, size)) if id == expected => Ok(size),
        Some((id, _)) => Err(PlaybackError::malformed(
            offset,
            format!("expected {expected:?} chunk, found {id:?}"),
        )),
        None => Err(PlaybackError::malformed(
            offset,
            format!("missing {expected:?} chunk"),
        )),
    }
}

/// Read a chunk whose body is exactly one `T`
pub fn read_fixed_chunk<T: Pod>(file: &mut dyn ReadSeek, expected: ChunkId) -> Result<T> {
    let offset = file.stream_position()?;
    let size = expect_chunk(file, expected)?;
    if size as usize != size_of::<T>() {
        return Err(PlaybackError::malformed(
            offset,
            format!(
                "{expected:?} chunk is {size} bytes, expected {}",
                size_of::<T>()
            ),
        ));
    }
    read_pod(file, &format!("{expected:?} chunk"))
}

/// Skip `len` bytes forward
pub fn skip(file: &mut dyn ReadSeek, len: u64) -> Result<u64> {
    Ok(file.seek(SeekFrom::Current(len as i64))?)
}

/// Decode a NUL-padded fixed string
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// Little-endian cursor over a chunk body
pub struct BodyReader<'a> {
    body: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> BodyReader<'a> {
    /// `base` is the file offset of `body`, used in error messages
    pub fn new(body: &'a [u8], base: u64) -> Self {
        Self { body, pos: 0, base }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.body.len() - self.pos < n {
            return Err(PlaybackError::malformed(
                self.base + self.pos as u64,
                "chunk body too short",
            ));
        }
        let out = &self.body[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn f64(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(f64::from_le_bytes(arr))
    }

    pub fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn pod<T: Pod>(&mut self) -> Result<T> {
        let bytes = self.take(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn remaining(&self) -> usize {
        self.body.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_clean_eof_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(try_read_chunk_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_partial_header_is_malformed() {
        let mut cursor = Cursor::new(vec![1u8, 0, 0]);
        let err = try_read_chunk_header(&mut cursor).unwrap_err();
        assert!(matches!(err, PlaybackError::MalformedRecord { offset: 0, .. }));
    }

    #[test]
    fn test_expect_chunk_mismatch() {
        let header = ChunkHeader { id: 2, size: 0 };
        let mut cursor = Cursor::new(bytemuck::bytes_of(&header).to_vec());
        let err = expect_chunk(&mut cursor, ChunkId::StreamInfo).unwrap_err();
        assert!(err.to_string().contains("expected StreamInfo"));
    }

    #[test]
    fn test_fixed_str() {
        let mut raw = [0u8; 16];
        raw[..5].copy_from_slice(b"D435 ");
        assert_eq!(fixed_str(&raw), "D435");
    }

    #[test]
    fn test_body_reader() {
        let mut body = Vec::new();
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(b"abc");
        body.extend_from_slice(&1.5f64.to_le_bytes());

        let mut reader = BodyReader::new(&body, 100);
        assert_eq!(reader.string().unwrap(), "abc");
        assert_eq!(reader.f64().unwrap(), 1.5);
        assert_eq!(reader.remaining(), 0);
        assert!(matches!(
            reader.u32().unwrap_err(),
            PlaybackError::MalformedRecord { offset: 115, .. }
        ));
    }
}
