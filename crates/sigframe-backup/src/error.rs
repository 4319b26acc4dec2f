//! Error types for backup stream sessions

use sigframe_crypto::CryptoError;
use sigframe_proto::{AttachmentError, FrameKind, ProtocolError};
use thiserror::Error;

/// Errors from decrypting or encrypting a backup stream
#[derive(Debug, Error)]
pub enum BackupError {
    /// The stream ended inside a length prefix, a frame or an attachment body
    #[error("truncated stream at offset {offset}: needed {expected} bytes, {actual} left")]
    TruncatedStream {
        /// Byte offset of the unit being read
        offset: u64,
        /// Bytes the unit requires
        expected: u64,
        /// Bytes remaining in the source
        actual: u64,
    },

    /// The first unit of the stream is not a usable header
    #[error("stream does not start with a valid header: {reason}")]
    InvalidHeader {
        /// What was wrong with it
        reason: String,
    },

    /// A frame the encryptor manages itself was passed in
    #[error("{kind} frames are written by the encryptor itself")]
    ReservedFrame {
        /// Offending frame kind
        kind: FrameKind,
    },

    /// Attachment data does not match the length its frame declares
    #[error("attachment is {actual} bytes but its frame declares {declared}")]
    AttachmentLengthMismatch {
        /// Length field of the frame
        declared: u32,
        /// Bytes available
        actual: usize,
    },

    /// A frame exceeds the 32-bit length prefix
    #[error("sealed frame of {len} bytes does not fit a length prefix")]
    FrameTooLarge {
        /// Sealed length
        len: usize,
    },

    /// Frame decoding failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key derivation or cipher failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Attachment read failure
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// Stream read or write failure
    #[error("backup i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Returns true if the stream walk cannot continue after this error
    ///
    /// Structural problems leave the ratchet position unknown, so nothing
    /// after them can be decrypted. Attachment failures only lose one body.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::TruncatedStream { .. } => true,
            Self::InvalidHeader { .. } => true,
            Self::FrameTooLarge { .. } => true,
            Self::Io(_) => true,
            Self::Protocol(err) => err.is_fatal(),
            Self::Crypto(err) => err.is_fatal(),

            Self::ReservedFrame { .. } => false,
            Self::AttachmentLengthMismatch { .. } => false,
            Self::Attachment(_) => false,
        }
    }
}
