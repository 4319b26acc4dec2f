//! Passphrase stretching and session key expansion
//!
//! ```text
//! passphrase digits (30) + header salt
//!        │
//!        ▼
//! SHA-512 stretch, 250 000 rounds → Backup Key (first 32 bytes)
//!        │
//!        ▼
//! HKDF-SHA256 "Backup Export" → cipher key ‖ MAC key
//! ```

use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// Number of passphrase digits a backup passphrase must contain.
pub const PASSPHRASE_DIGITS: usize = 30;

/// SHA-512 rounds in the passphrase stretch. Fixed by the format.
pub const STRETCH_ROUNDS: usize = 250_000;

/// HKDF info label for the session keys
const EXPORT_LABEL: &[u8] = b"Backup Export";

/// Stretched passphrase, input to [`derive_frame_keys`].
#[derive(Clone)]
pub struct BackupKey {
    key: [u8; 32],
}

impl BackupKey {
    /// Wrap raw key bytes (tests and callers that cache stretched keys).
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl Drop for BackupKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BackupKey(..)")
    }
}

/// Session keys shared by the frame stream and its Android attachments.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameKeys {
    cipher_key: [u8; 32],
    mac_key: [u8; 32],
}

impl FrameKeys {
    /// Build from already expanded key halves.
    pub fn new(cipher_key: [u8; 32], mac_key: [u8; 32]) -> Self {
        Self { cipher_key, mac_key }
    }

    /// AES-256 key.
    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    /// HMAC-SHA256 key.
    pub fn mac_key(&self) -> &[u8; 32] {
        &self.mac_key
    }
}

impl Drop for FrameKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for FrameKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameKeys(..)")
    }
}

/// Stretch a passphrase into the backup key.
///
/// Only ASCII digits count; spaces and dashes used for display grouping are
/// ignored.
///
/// # Errors
///
/// - `CryptoError::KeyDerivationFailed` unless exactly
///   [`PASSPHRASE_DIGITS`] digits are present
pub fn derive_backup_key(passphrase: &str, salt: &[u8]) -> Result<BackupKey, CryptoError> {
    let digits: Zeroizing<Vec<u8>> =
        Zeroizing::new(passphrase.bytes().filter(u8::is_ascii_digit).collect());

    if digits.len() != PASSPHRASE_DIGITS {
        return Err(CryptoError::KeyDerivationFailed {
            reason: "passphrase must contain exactly 30 digits",
        });
    }

    Ok(stretch(&digits, salt, STRETCH_ROUNDS))
}

/// `d = H(salt ‖ p ‖ p)`, then `d = H(d ‖ p)` until `rounds` hashes are done.
fn stretch(digits: &[u8], salt: &[u8], rounds: usize) -> BackupKey {
    let mut digest = Zeroizing::new([0u8; 64]);
    digest.copy_from_slice(
        &Sha512::new().chain_update(salt).chain_update(digits).chain_update(digits).finalize(),
    );
    for _ in 1..rounds {
        let next = Sha512::new().chain_update(digest.as_slice()).chain_update(digits).finalize();
        digest.copy_from_slice(&next);
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    BackupKey { key }
}

/// Expand the backup key into cipher and MAC keys.
pub fn derive_frame_keys(backup_key: &BackupKey) -> FrameKeys {
    let hkdf = Hkdf::<Sha256>::new(Some(&[0u8; 32]), backup_key.as_bytes());

    let mut okm = Zeroizing::new([0u8; 64]);
    let Ok(()) = hkdf.expand(EXPORT_LABEL, okm.as_mut_slice()) else {
        unreachable!("64 bytes is a valid HKDF-SHA256 output length");
    };

    let mut cipher_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    cipher_key.copy_from_slice(&okm[..32]);
    mac_key.copy_from_slice(&okm[32..]);
    FrameKeys { cipher_key, mac_key }
}

/// Passphrase straight to session keys.
pub fn derive_keys(passphrase: &str, salt: &[u8]) -> Result<FrameKeys, CryptoError> {
    derive_backup_key(passphrase, salt).map(|key| derive_frame_keys(&key))
}
