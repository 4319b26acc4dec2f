//! Backup sessions: stream decryption, stream encryption and attachment
//! readers.
//!
//! # Layering
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ FrameDecryptor / Encryptor   │  length prefixes, ratchet order, stats
//! ├──────────────────────────────┤
//! │ sigframe-crypto              │  keys, frame sealing, body ciphers
//! ├──────────────────────────────┤
//! │ sigframe-proto               │  fields, frames, attachment slots
//! └──────────────────────────────┘
//! ```
//!
//! Attachment bodies are not read during the walk. Each attachment, sticker
//! or avatar frame carries a reader that knows where its body sits and which
//! IV decrypts it; [`Frame::attachment_data`] pulls the bytes on demand.
//!
//! # Error model
//!
//! Structural errors (truncation, malformed frames) end the walk. A frame
//! with a bad tag is still returned, marked [`MacStatus::Bad`]. A frame that
//! decodes but fails validation is logged and skipped. Whether a backup was
//! complete is reported by [`SessionStats::complete`].
//!
//! [`Frame::attachment_data`]: sigframe_proto::Frame::attachment_data
//! [`MacStatus::Bad`]: sigframe_proto::MacStatus::Bad

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod decryptor;
pub mod diagnostics;
pub mod encryptor;
pub mod error;
pub mod readers;
pub mod source;

pub use config::{DecryptorConfig, EncryptorConfig};
pub use decryptor::{DecodedFrame, FrameDecryptor, LENGTH_PREFIX_LEN};
pub use diagnostics::{Diagnostics, SessionStats};
pub use encryptor::FrameEncryptor;
pub use error::BackupError;
pub use readers::{
    AndroidAttachmentReader, Base64Source, DesktopAttachmentReader, PlainTextBackupReader,
    RawFileReader,
};
pub use source::{SharedSource, SourceReader};
