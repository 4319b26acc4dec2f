//! Streaming backup decryptor.
//!
//! # Stream layout
//!
//! ```text
//! [u32 BE len][Header frame, plaintext]
//! [u32 BE len][AES-CTR(frame) ‖ tag]
//! [u32 BE len][AES-CTR(frame) ‖ tag][AES-CTR(body) ‖ 10-byte tag]   (attachment frames)
//! ...
//! [u32 BE len][AES-CTR(end frame) ‖ tag]
//! ```
//!
//! # Invariants
//!
//! - The ratchet advances once per frame and once per attachment body, in
//!   stream order, whether or not the unit authenticates.
//! - Length prefixes are bounds-checked against the remaining source before
//!   any buffer is allocated.
//! - After an error the decryptor yields nothing more; the ratchet position
//!   is no longer trustworthy.

use std::io::{Read, Seek, SeekFrom};

use sigframe_crypto::{ANDROID_MAC_LEN, CryptoState, FrameKeys, derive_keys, open_frame};
use sigframe_proto::{Frame, FrameKind, HeaderFrame, MacStatus};

use crate::{
    config::DecryptorConfig,
    diagnostics::{Diagnostics, SessionStats},
    error::BackupError,
    readers::AndroidAttachmentReader,
    source::{SharedSource, SourceReader},
};

/// Bytes in a unit length prefix.
pub const LENGTH_PREFIX_LEN: u64 = 4;

/// One frame as returned by the decryptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Position in the stream, header = 0
    pub sequence: u64,
    /// Byte offset of the frame's length prefix
    pub offset: u64,
    /// Decoded frame; attachment bodies are behind its reader
    pub frame: Frame,
    /// Frame tag result (`Unauthenticated` for the plaintext header)
    pub mac: MacStatus,
}

/// Pulls frames out of an encrypted backup, one at a time.
#[derive(Debug)]
pub struct FrameDecryptor {
    source: SharedSource,
    input: SourceReader,
    state: CryptoState,
    header: HeaderFrame,
    config: DecryptorConfig,
    diagnostics: Diagnostics,
    position: u64,
    sequence: u64,
    pending_header: Option<DecodedFrame>,
    finished: bool,
}

impl FrameDecryptor {
    /// Read the header and derive the session keys from `passphrase`.
    ///
    /// # Errors
    ///
    /// - `BackupError::InvalidHeader` if the first unit is not a valid header
    /// - `BackupError::Crypto` if the passphrase is malformed
    /// - `BackupError::TruncatedStream` if the header unit is cut short
    pub fn open(
        source: SharedSource,
        passphrase: &str,
        config: DecryptorConfig,
    ) -> Result<Self, BackupError> {
        Self::start(source, config, |header| Ok(derive_keys(passphrase, header.salt()?)?))
    }

    /// Like [`open`](Self::open) with already derived session keys.
    pub fn with_keys(
        source: SharedSource,
        keys: FrameKeys,
        config: DecryptorConfig,
    ) -> Result<Self, BackupError> {
        Self::start(source, config, |_| Ok(keys))
    }

    fn start(
        source: SharedSource,
        config: DecryptorConfig,
        keys_for: impl FnOnce(&HeaderFrame) -> Result<FrameKeys, BackupError>,
    ) -> Result<Self, BackupError> {
        let mut input = source.open()?;
        let header_bytes = read_unit(&mut input, 0, 0)?;

        let header = match Frame::decode(&header_bytes) {
            Ok(Frame::Header(header)) => header,
            Ok(other) => {
                return Err(BackupError::InvalidHeader {
                    reason: format!("first frame is a {} frame", other.kind()),
                });
            },
            Err(err) => return Err(BackupError::InvalidHeader { reason: err.to_string() }),
        };
        let iv = header
            .validate()
            .and_then(|()| header.iv())
            .map_err(|err| BackupError::InvalidHeader { reason: err.to_string() })?;

        let keys = keys_for(&header)?;
        let state = CryptoState::new(keys, iv, config.mac_era);

        tracing::debug!(
            version = ?header.version().ok().flatten(),
            mac_era = ?config.mac_era,
            len = input.len(),
            "opened backup stream"
        );

        let pending_header = DecodedFrame {
            sequence: 0,
            offset: 0,
            frame: Frame::Header(header.clone()),
            mac: MacStatus::Unauthenticated,
        };

        Ok(Self {
            source,
            position: LENGTH_PREFIX_LEN + header_bytes.len() as u64,
            input,
            state,
            header,
            config,
            diagnostics: Diagnostics::new(),
            sequence: 1,
            pending_header: Some(pending_header),
            finished: false,
        })
    }

    /// Stream header.
    pub fn header(&self) -> &HeaderFrame {
        &self.header
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        self.diagnostics.stats()
    }

    /// Byte offset of the next unit.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Next valid frame, or `None` at the end of the stream.
    ///
    /// Frames failing validation are logged and skipped. Frames whose tag
    /// fails are returned with [`MacStatus::Bad`].
    ///
    /// # Errors
    ///
    /// - `BackupError::TruncatedStream` if a length prefix, frame or
    ///   attachment body overruns the source
    /// - `BackupError::Protocol` if a frame's plaintext is structurally
    ///   malformed, or its LENGTH field does not fit in a `u32`
    ///
    /// Every error ends the walk.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>, BackupError> {
        let result = self.step();
        if result.is_err() {
            self.finished = true;
        }
        result
    }

    /// Log the session summary and return the counters.
    pub fn finish(self) -> SessionStats {
        let stats = *self.diagnostics.stats();
        stats.log_summary();
        stats
    }

    fn step(&mut self) -> Result<Option<DecodedFrame>, BackupError> {
        if let Some(header) = self.pending_header.take() {
            self.diagnostics.stats_mut().decoded += 1;
            return Ok(Some(header));
        }

        loop {
            if self.finished {
                return Ok(None);
            }

            let offset = self.position;
            if offset >= self.input.len() {
                self.end_of_source();
                return Ok(None);
            }

            let sealed = read_unit(&mut self.input, offset, self.state.era().tag_len())?;
            self.position += LENGTH_PREFIX_LEN + sealed.len() as u64;

            let sequence = self.sequence;
            self.sequence += 1;

            let opened = open_frame(&mut self.state, &sealed)?;
            if opened.mac == MacStatus::Bad {
                tracing::warn!(sequence, offset, "bad MAC in frame");
                self.diagnostics.stats_mut().bad_mac += 1;
            }

            let mut frame = Frame::decode(&opened.plaintext)?;

            let size = frame.body_length()?;
            if size > 0 {
                self.attach_body(&mut frame, sequence, size)?;
            } else if frame.declared_length() == Some(0) {
                tracing::warn!(sequence, offset, kind = %frame.kind(), "frame declares a 0-byte body");
                frame.set_attachment_data(Vec::new());
            }

            if let Err(err) = frame.validate() {
                tracing::warn!(sequence, offset, kind = %frame.kind(), error = %err, "dropping invalid frame");
                self.diagnostics.stats_mut().rejected += 1;
                continue;
            }

            if frame.kind() == FrameKind::End {
                self.end_frame_seen();
            }

            self.diagnostics.stats_mut().decoded += 1;
            return Ok(Some(DecodedFrame { sequence, offset, frame, mac: opened.mac }));
        }
    }

    /// Claim the body that follows `frame`: one ratchet step, a reader over
    /// the body, and a skip past it.
    fn attach_body(&mut self, frame: &mut Frame, sequence: u64, size: u32) -> Result<(), BackupError> {
        let body_offset = self.position;
        let stored = u64::from(size) + ANDROID_MAC_LEN as u64;
        let available = self.input.len().saturating_sub(body_offset);
        if available < stored {
            return Err(BackupError::TruncatedStream {
                offset: body_offset,
                expected: stored,
                actual: available,
            });
        }

        let iv = self.state.advance();
        self.position += stored;
        self.input.seek(SeekFrom::Start(self.position))?;

        let reader = AndroidAttachmentReader::new(
            self.source.clone(),
            body_offset,
            iv,
            self.state.keys().clone(),
            size,
        );
        frame.set_attachment_reader(Box::new(reader));
        self.diagnostics.stats_mut().attachments += 1;

        if !self.config.lazy_attachments {
            match frame.attachment_data(self.config.verbose) {
                Ok(payload) if payload.mac == MacStatus::Bad => {
                    self.diagnostics.stats_mut().bad_attachment_mac += 1;
                },
                Ok(_) => {},
                Err(err) => {
                    tracing::warn!(sequence, offset = body_offset, error = %err, "failed to read attachment body");
                },
            }
        }
        Ok(())
    }

    fn end_frame_seen(&mut self) {
        self.diagnostics.stats_mut().complete = true;
        self.finished = true;

        let trailing = self.input.len().saturating_sub(self.position);
        if trailing > 0 && self.diagnostics.first_time("trailing-data") {
            tracing::warn!(offset = self.position, trailing, "ignoring data after end frame");
        }
    }

    fn end_of_source(&mut self) {
        self.finished = true;
        if !self.diagnostics.stats().complete && self.diagnostics.first_time("incomplete") {
            tracing::warn!(offset = self.position, "backup ends without an end frame");
        }
    }
}

impl Iterator for FrameDecryptor {
    type Item = Result<DecodedFrame, BackupError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Read one length-prefixed unit at `offset` (the reader's position).
///
/// Checks run before allocation: the prefix must fit, the declared length
/// must fit the remaining source, and it must at least hold a `min_len` tag.
fn read_unit(input: &mut SourceReader, offset: u64, min_len: usize) -> Result<Vec<u8>, BackupError> {
    let remaining = input.len().saturating_sub(offset);
    if remaining < LENGTH_PREFIX_LEN {
        return Err(BackupError::TruncatedStream {
            offset,
            expected: LENGTH_PREFIX_LEN,
            actual: remaining,
        });
    }

    let mut prefix = [0u8; LENGTH_PREFIX_LEN as usize];
    input.read_exact(&mut prefix)?;
    let len = u64::from(u32::from_be_bytes(prefix));

    let available = remaining - LENGTH_PREFIX_LEN;
    if len > available {
        return Err(BackupError::TruncatedStream { offset, expected: len, actual: available });
    }
    if len < min_len as u64 {
        return Err(BackupError::TruncatedStream { offset, expected: min_len as u64, actual: len });
    }

    let mut unit = vec![0u8; len as usize];
    input.read_exact(&mut unit)?;
    Ok(unit)
}
