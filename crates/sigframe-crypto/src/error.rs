//! Error types for key derivation and cipher operations

use thiserror::Error;

/// Errors from key derivation and frame/attachment ciphers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Passphrase could not be turned into a backup key
    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed {
        /// What was wrong with the passphrase
        reason: &'static str,
    },

    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// Sealed unit cannot even hold its authentication tag
    #[error("sealed unit of {len} bytes is shorter than its {tag_len}-byte tag")]
    SealedTooShort {
        /// Bytes available
        len: usize,
        /// Tag length for the MAC era in use
        tag_len: usize,
    },

    /// Ciphertext layout does not fit the scheme (too short, misaligned)
    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext {
        /// What was wrong with the layout
        reason: &'static str,
    },

    /// Block padding did not verify after decryption
    #[error("invalid block padding")]
    InvalidPadding,
}

impl CryptoError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors leave the stream ratchet or the session keys unusable.
    /// The rest only affect the single attachment being opened.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::KeyDerivationFailed { .. } => true,
            Self::InvalidKeyLength { .. } => true,
            Self::SealedTooShort { .. } => true,

            Self::MalformedCiphertext { .. } => false,
            Self::InvalidPadding => false,
        }
    }
}
