use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD};
use sigframe_proto::{AttachmentError, AttachmentPayload, AttachmentReader, MacStatus};

use crate::source::SharedSource;

/// Where the base64 text of a plaintext-backup attachment lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base64Source {
    /// Text held in memory
    Inline(String),
    /// Span of a larger document on disk
    File {
        /// Document path
        path: PathBuf,
        /// Byte offset of the first base64 character
        offset: u64,
        /// Number of base64 characters
        len: u64,
    },
}

/// Base64-encoded attachment from a plaintext interchange document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextBackupReader {
    source: Base64Source,
}

impl PlainTextBackupReader {
    /// Reader over in-memory base64 text.
    pub fn inline(text: impl Into<String>) -> Self {
        Self { source: Base64Source::Inline(text.into()) }
    }

    /// Reader over `len` base64 characters at `offset` in the file at `path`.
    pub fn in_file(path: impl Into<PathBuf>, offset: u64, len: u64) -> Self {
        Self { source: Base64Source::File { path: path.into(), offset, len } }
    }

    /// Source description.
    pub fn source(&self) -> &Base64Source {
        &self.source
    }

    /// Decoded size, computed from the text length and its `=` padding
    /// without decoding.
    pub fn data_size(&self) -> Result<u64, AttachmentError> {
        match &self.source {
            Base64Source::Inline(text) => Ok(decoded_len(text.len() as u64, text.as_bytes())),
            Base64Source::File { path, offset, len } => {
                let tail_len = (*len).min(2);
                let tail = SharedSource::file(path.clone()).read_at(offset + len - tail_len, tail_len)?;
                Ok(decoded_len(*len, &tail))
            },
        }
    }

    fn text(&self) -> Result<Vec<u8>, AttachmentError> {
        match &self.source {
            Base64Source::Inline(text) => Ok(text.as_bytes().to_vec()),
            Base64Source::File { path, offset, len } => {
                SharedSource::file(path.clone()).read_at(*offset, *len)
            },
        }
    }
}

/// `len / 4 * 3` minus one byte per trailing `=` (at most two).
fn decoded_len(len: u64, text: &[u8]) -> u64 {
    let padding = text.iter().rev().take(2).take_while(|&&b| b == b'=').count() as u64;
    (len / 4 * 3).saturating_sub(padding)
}

impl AttachmentReader for PlainTextBackupReader {
    fn read_attachment(&self, verbose: bool) -> Result<AttachmentPayload, AttachmentError> {
        let text = self.text()?;
        let data =
            STANDARD.decode(&text).map_err(|e| AttachmentError::Base64 { reason: e.to_string() })?;

        if data.is_empty() {
            return Err(AttachmentError::Base64 { reason: "decoded to zero bytes".to_owned() });
        }
        if verbose {
            tracing::debug!(len = data.len(), "decoded base64 attachment");
        }

        Ok(AttachmentPayload { data, mac: MacStatus::Unauthenticated })
    }

    fn clone_box(&self) -> Box<dyn AttachmentReader> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn data_size_counts_padding() {
        assert_eq!(PlainTextBackupReader::inline("aGVsbG8=").data_size().unwrap(), 5);
        assert_eq!(PlainTextBackupReader::inline("aGk=").data_size().unwrap(), 2);
        assert_eq!(PlainTextBackupReader::inline("aA==").data_size().unwrap(), 1);
        assert_eq!(PlainTextBackupReader::inline("aGV5").data_size().unwrap(), 3);
        assert_eq!(PlainTextBackupReader::inline("").data_size().unwrap(), 0);
    }

    #[test]
    fn data_size_matches_decode() {
        for len in 1..40 {
            let raw: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let reader = PlainTextBackupReader::inline(STANDARD.encode(&raw));
            assert_eq!(reader.data_size().unwrap(), len as u64);
            assert_eq!(reader.read_attachment(false).unwrap().data, raw);
        }
    }

    #[test]
    fn reads_span_of_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<part data=\"aGVsbG8=\"/>").unwrap();

        let reader = PlainTextBackupReader::in_file(file.path(), 12, 8);
        assert_eq!(reader.data_size().unwrap(), 5);

        let payload = reader.read_attachment(false).unwrap();
        assert_eq!(payload.data, b"hello");
        assert_eq!(payload.mac, MacStatus::Unauthenticated);
    }

    #[test]
    fn empty_decode_is_error() {
        assert!(matches!(
            PlainTextBackupReader::inline("").read_attachment(false),
            Err(AttachmentError::Base64 { .. })
        ));
    }

    #[test]
    fn invalid_base64_is_error() {
        assert!(matches!(
            PlainTextBackupReader::inline("!!!!").read_attachment(false),
            Err(AttachmentError::Base64 { .. })
        ));
    }
}
