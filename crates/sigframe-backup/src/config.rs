//! Session configuration.

use sigframe_crypto::MacEra;

/// Decryptor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptorConfig {
    /// Frame authentication scheme of the backup
    pub mac_era: MacEra,
    /// Log per-attachment detail while reading bodies
    pub verbose: bool,
    /// Defer attachment bodies until first access. When false every body is
    /// read and authenticated as its frame is decoded.
    pub lazy_attachments: bool,
}

impl Default for DecryptorConfig {
    fn default() -> Self {
        Self { mac_era: MacEra::Truncated, verbose: false, lazy_attachments: true }
    }
}

/// Encryptor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncryptorConfig {
    /// Frame authentication scheme to write
    pub mac_era: MacEra,
}
