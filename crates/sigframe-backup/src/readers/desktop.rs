use std::{fs, path::PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use sigframe_crypto::{DesktopKey, desktop_ciphertext_len, open_desktop};
use sigframe_proto::{AttachmentError, AttachmentPayload, AttachmentReader, MacStatus};

use super::RawFileReader;

/// Attachment file written by the desktop app.
///
/// Version 2 and later files are `[IV][AES-256-CBC ciphertext][HMAC]` under
/// a per-file base64 key. Earlier versions stored attachments in the clear.
#[derive(Clone)]
pub struct DesktopAttachmentReader {
    version: u32,
    path: PathBuf,
    local_key: String,
    size: u64,
}

impl DesktopAttachmentReader {
    /// First version with encrypted attachment files.
    pub const ENCRYPTED_SINCE: u32 = 2;

    /// Reader for the file at `path` holding `size` plaintext bytes.
    pub fn new(version: u32, path: impl Into<PathBuf>, local_key: impl Into<String>, size: u64) -> Self {
        Self { version, path: path.into(), local_key: local_key.into(), size }
    }

    fn key(&self) -> Result<DesktopKey, AttachmentError> {
        let raw = STANDARD
            .decode(self.local_key.trim())
            .map_err(|e| AttachmentError::InvalidKey { reason: e.to_string() })?;
        DesktopKey::from_slice(&raw).map_err(|e| AttachmentError::InvalidKey { reason: e.to_string() })
    }
}

impl std::fmt::Debug for DesktopAttachmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopAttachmentReader")
            .field("version", &self.version)
            .field("path", &self.path)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl AttachmentReader for DesktopAttachmentReader {
    fn read_attachment(&self, verbose: bool) -> Result<AttachmentPayload, AttachmentError> {
        if self.version < Self::ENCRYPTED_SINCE {
            return RawFileReader::new(&self.path).read_attachment(verbose);
        }

        let key = self.key()?;
        let open_err = |source| AttachmentError::Open { path: self.path.clone(), source };

        // Declared size is checked against the file before anything is read
        let file_len = fs::metadata(&self.path).map_err(open_err)?.len();
        let capacity = desktop_ciphertext_len(file_len as usize).ok_or(AttachmentError::Decrypt {
            reason: "file shorter than IV and MAC".to_owned(),
        })? as u64;
        if self.size >= capacity {
            return Err(AttachmentError::SizeMismatch { declared: self.size, capacity });
        }

        let file = fs::read(&self.path).map_err(open_err)?;
        let opened =
            open_desktop(&key, &file).map_err(|e| AttachmentError::Decrypt { reason: e.to_string() })?;

        let Some(mut data) = opened.plaintext else {
            tracing::warn!(path = %self.path.display(), "bad MAC in desktop attachment");
            return Ok(AttachmentPayload { data: Vec::new(), mac: MacStatus::Bad });
        };

        if (data.len() as u64) < self.size {
            tracing::warn!(
                path = %self.path.display(),
                declared = self.size,
                actual = data.len(),
                "desktop attachment shorter than declared"
            );
        }
        data.truncate(self.size as usize);

        if verbose {
            tracing::debug!(path = %self.path.display(), len = data.len(), "desktop attachment verified");
        }
        Ok(AttachmentPayload { data, mac: opened.mac })
    }

    fn clone_box(&self) -> Box<dyn AttachmentReader> {
        Box::new(self.clone())
    }
}
