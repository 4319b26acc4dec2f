use std::{fs, path::PathBuf};

use sigframe_proto::{AttachmentError, AttachmentPayload, AttachmentReader, MacStatus};

/// Whole plaintext file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileReader {
    path: PathBuf,
}

impl RawFileReader {
    /// Reader for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AttachmentReader for RawFileReader {
    fn read_attachment(&self, verbose: bool) -> Result<AttachmentPayload, AttachmentError> {
        let data = fs::read(&self.path)
            .map_err(|source| AttachmentError::Open { path: self.path.clone(), source })?;

        if data.is_empty() {
            tracing::warn!(path = %self.path.display(), "asked to read 0-byte attachment");
        } else if verbose {
            tracing::debug!(path = %self.path.display(), len = data.len(), "read raw attachment");
        }

        Ok(AttachmentPayload { data, mac: MacStatus::Unauthenticated })
    }

    fn clone_box(&self) -> Box<dyn AttachmentReader> {
        Box::new(self.clone())
    }
}
