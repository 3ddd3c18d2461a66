//! File I/O primitive shared by the index scanner and the payload reader.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use contracts::{PlaybackError, Result};
use tracing::debug;

/// Buffered, seekable handle on a recording
///
/// The engine opens two of these: one scanned sequentially by the indexer and
/// one used for random-access payload reads.
#[derive(Debug)]
pub struct RecordingFile {
    path: PathBuf,
    reader: BufReader<File>,
    len: u64,
}

impl RecordingFile {
    /// Open `path`, mapping failures to `FileNotFound` / `FileUnreadable`
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PlaybackError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => PlaybackError::file_unreadable(path.display().to_string(), e.to_string()),
        })?;
        let metadata = file
            .metadata()
            .map_err(|e| PlaybackError::file_unreadable(path.display().to_string(), e.to_string()))?;
        if metadata.is_dir() {
            return Err(PlaybackError::file_unreadable(
                path.display().to_string(),
                "is a directory",
            ));
        }

        debug!(path = %path.display(), len = metadata.len(), "Opened recording");
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size at open time
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly `len` bytes at `offset`
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Read for RecordingFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for RecordingFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = RecordingFile::open(&dir.path().join("missing.rscp")).unwrap_err();
        assert!(matches!(err, PlaybackError::FileNotFound { .. }));
    }

    #[test]
    fn test_open_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = RecordingFile::open(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::FileUnreadable { .. } | PlaybackError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_read_at() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let mut file = RecordingFile::open(tmp.path()).unwrap();
        assert_eq!(file.len(), 10);
        assert_eq!(file.read_at(3, 4).unwrap(), b"3456");
        assert!(file.read_at(8, 4).is_err());
    }
}
