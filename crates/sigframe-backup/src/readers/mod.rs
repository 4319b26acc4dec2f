//! Concrete attachment readers.
//!
//! | Reader | Source | Authentication |
//! |---|---|---|
//! | [`RawFileReader`] | plaintext file | none |
//! | [`AndroidAttachmentReader`] | body inside the backup stream | 10-byte HMAC |
//! | [`DesktopAttachmentReader`] | desktop attachment file | 32-byte HMAC |
//! | [`PlainTextBackupReader`] | base64 in memory or in a file | none |

mod android;
mod desktop;
mod plaintext;
mod raw;

pub use android::AndroidAttachmentReader;
pub use desktop::DesktopAttachmentReader;
pub use plaintext::{Base64Source, PlainTextBackupReader};
pub use raw::RawFileReader;
