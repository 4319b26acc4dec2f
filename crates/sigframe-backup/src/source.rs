//! Read-only byte sources shared between the stream walk and attachment
//! readers.
//!
//! Files are referenced by path and reopened per reader, memory sources share
//! one `Bytes` buffer. Either way no reader holds state another can disturb.

use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use sigframe_proto::AttachmentError;

/// Cheaply clonable handle to backup bytes.
#[derive(Debug, Clone)]
pub enum SharedSource {
    /// File on disk, opened on demand
    File(Arc<PathBuf>),
    /// In-memory buffer
    Memory(Bytes),
}

impl SharedSource {
    /// File-backed source.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(Arc::new(path.into()))
    }

    /// Memory-backed source.
    pub fn memory(bytes: impl Into<Bytes>) -> Self {
        Self::Memory(bytes.into())
    }

    /// Backing path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path.as_path()),
            Self::Memory(_) => None,
        }
    }

    /// Fresh independent reader positioned at offset 0.
    pub fn open(&self) -> Result<SourceReader, AttachmentError> {
        match self {
            Self::File(path) => {
                let file = File::open(path.as_path())
                    .map_err(|source| AttachmentError::Open { path: path.to_path_buf(), source })?;
                let len = file.metadata()?.len();
                Ok(SourceReader { inner: Inner::File(BufReader::new(file)), len })
            },
            Self::Memory(bytes) => Ok(SourceReader {
                len: bytes.len() as u64,
                inner: Inner::Memory(Cursor::new(bytes.clone())),
            }),
        }
    }

    /// Read exactly `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// - `AttachmentError::ShortRead` if the source ends first; checked before
    ///   allocating
    pub fn read_at(&self, offset: u64, len: u64) -> Result<Vec<u8>, AttachmentError> {
        let mut reader = self.open()?;
        reader.ensure_available(offset, len)?;
        reader.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug)]
enum Inner {
    File(BufReader<File>),
    Memory(Cursor<Bytes>),
}

/// Seekable reader over a [`SharedSource`] that knows the total length.
#[derive(Debug)]
pub struct SourceReader {
    inner: Inner,
    len: u64,
}

impl SourceReader {
    /// Total source length.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True for an empty source.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fail with `ShortRead` unless `[offset, offset + len)` lies inside the
    /// source.
    pub fn ensure_available(&self, offset: u64, len: u64) -> Result<(), AttachmentError> {
        let available = self.len.saturating_sub(offset);
        if available < len {
            return Err(AttachmentError::ShortRead { expected: len, actual: available });
        }
        Ok(())
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File(file) => file.read(buf),
            Inner::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::File(file) => file.seek(pos),
            Inner::Memory(cursor) => cursor.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn memory_read_at() {
        let source = SharedSource::memory(vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(source.read_at(2, 3).unwrap(), [2, 3, 4]);
        assert!(source.path().is_none());
    }

    #[test]
    fn short_read_is_reported_before_allocating() {
        let source = SharedSource::memory(vec![0; 4]);
        assert!(matches!(
            source.read_at(2, 1 << 40),
            Err(AttachmentError::ShortRead { expected, actual: 2 }) if expected == 1 << 40
        ));
    }

    #[test]
    fn file_readers_are_independent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdef").unwrap();
        let source = SharedSource::file(file.path());

        let mut a = source.open().unwrap();
        let mut b = source.open().unwrap();
        a.seek(SeekFrom::Start(4)).unwrap();

        let mut first = [0u8; 2];
        b.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"ab");
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn missing_file() {
        let source = SharedSource::file("/nonexistent/backup");
        assert!(matches!(source.open(), Err(AttachmentError::Open { .. })));
    }
}
