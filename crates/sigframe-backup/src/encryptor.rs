//! Streaming backup encryptor, the inverse of [`FrameDecryptor`].
//!
//! [`FrameDecryptor`]: crate::FrameDecryptor

use std::io::Write;

use sigframe_crypto::{AndroidEncryptor, CHUNK_SIZE, CryptoState, FrameKeys, derive_keys, seal_frame};
use sigframe_proto::{EndFrame, Frame, FrameKind, HeaderFrame};

use crate::{config::EncryptorConfig, error::BackupError};

/// Writes an encrypted backup frame by frame.
///
/// The plaintext header goes out on construction. [`finish`](Self::finish)
/// appends the end frame; a stream dropped without it reads back as
/// incomplete.
#[derive(Debug)]
pub struct FrameEncryptor<W: Write> {
    writer: W,
    state: CryptoState,
    frames_written: u64,
}

impl<W: Write> FrameEncryptor<W> {
    /// Start a stream keyed from `passphrase` and the header's salt.
    ///
    /// # Errors
    ///
    /// - `BackupError::InvalidHeader` if the header is incomplete
    /// - `BackupError::Crypto` if the passphrase is malformed
    /// - `BackupError::Io` if writing the header fails
    pub fn new(
        writer: W,
        passphrase: &str,
        header: &HeaderFrame,
        config: EncryptorConfig,
    ) -> Result<Self, BackupError> {
        let salt = header
            .validate()
            .and_then(|()| header.salt())
            .map_err(|err| BackupError::InvalidHeader { reason: err.to_string() })?;
        let keys = derive_keys(passphrase, salt)?;
        Self::with_keys(writer, keys, header, config)
    }

    /// Start a stream with already derived session keys.
    pub fn with_keys(
        mut writer: W,
        keys: FrameKeys,
        header: &HeaderFrame,
        config: EncryptorConfig,
    ) -> Result<Self, BackupError> {
        let iv = header
            .validate()
            .and_then(|()| header.iv())
            .map_err(|err| BackupError::InvalidHeader { reason: err.to_string() })?;

        write_unit(&mut writer, &Frame::Header(header.clone()).to_bytes())?;
        tracing::debug!(mac_era = ?config.mac_era, "started backup stream");

        Ok(Self { writer, state: CryptoState::new(keys, iv, config.mac_era), frames_written: 1 })
    }

    /// Frames written so far, header included.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Encrypt and append one frame, followed by its attachment body if it
    /// declares one.
    ///
    /// The body comes from the frame's cached payload, loading it through the
    /// reader first if needed.
    ///
    /// # Errors
    ///
    /// - `BackupError::ReservedFrame` for header and end frames
    /// - `BackupError::Protocol` if the frame fails validation
    /// - `BackupError::Attachment` if the body cannot be loaded
    /// - `BackupError::AttachmentLengthMismatch` if the body length differs
    ///   from the LENGTH field
    ///
    /// All of these are detected before anything is written.
    pub fn write_frame(&mut self, frame: &mut Frame) -> Result<(), BackupError> {
        let kind = frame.kind();
        if matches!(kind, FrameKind::Header | FrameKind::End) {
            return Err(BackupError::ReservedFrame { kind });
        }
        frame.validate()?;

        let declared = frame.declared_length().unwrap_or(0);
        let body = if declared > 0 {
            let payload = frame.attachment_data(false)?;
            if payload.data.len() != declared as usize {
                return Err(BackupError::AttachmentLengthMismatch {
                    declared,
                    actual: payload.data.len(),
                });
            }
            Some(payload.data.clone())
        } else {
            None
        };

        self.write_sealed(frame)?;

        if let Some(mut body) = body {
            let iv = self.state.advance();
            let mut encryptor = AndroidEncryptor::new(self.state.keys(), &iv);
            for chunk in body.chunks_mut(CHUNK_SIZE) {
                encryptor.update(chunk);
                self.writer.write_all(chunk)?;
            }
            self.writer.write_all(&encryptor.finalize())?;
            tracing::trace!(kind = %kind, len = declared, "wrote attachment body");
        }
        Ok(())
    }

    /// Append the end frame, flush and hand back the writer.
    pub fn finish(mut self) -> Result<W, BackupError> {
        self.write_sealed(&Frame::End(EndFrame::new()))?;
        self.writer.flush()?;
        tracing::debug!(frames = self.frames_written, "finished backup stream");
        Ok(self.writer)
    }

    fn write_sealed(&mut self, frame: &Frame) -> Result<(), BackupError> {
        let sealed = seal_frame(&mut self.state, &frame.to_bytes());
        write_unit(&mut self.writer, &sealed)?;
        self.frames_written += 1;
        Ok(())
    }
}

fn write_unit(writer: &mut impl Write, unit: &[u8]) -> Result<(), BackupError> {
    let len = u32::try_from(unit.len()).map_err(|_| BackupError::FrameTooLarge { len: unit.len() })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(unit)?;
    Ok(())
}
